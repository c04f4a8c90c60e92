//! [`Notification`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use postgres_types::Json;
use tracerr::Traced;

use crate::{
    domain::{notification::Event, Notification},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::notification::Undelivered,
};

impl<C> Database<Insert<Notification>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(notification)).await
    }
}

impl<C> Database<Update<Notification>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(notification): Update<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let Notification {
            id,
            recipient_id,
            event,
            created_at,
            delivered_at,
            failed_at,
            failure,
        } = notification;
        let name = event.name();
        let event = Json(event);

        const SQL: &str = "\
            INSERT INTO notifications (\
                id, recipient_id, name, event, \
                created_at, delivered_at, failed_at, failure \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::JSONB, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, $7::TIMESTAMPTZ, $8::TEXT \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET delivered_at = EXCLUDED.delivered_at, \
                failed_at = EXCLUDED.failed_at, \
                failure = EXCLUDED.failure";
        self.exec(
            SQL,
            &[
                &id,
                &recipient_id,
                &name,
                &event,
                &created_at,
                &delivered_at,
                &failed_at,
                &failure,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<Notification>, Undelivered>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Notification>, Undelivered>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let Undelivered { limit } = by.into_inner();
        let limit = i32::from(limit);

        const SQL: &str = "\
            SELECT id, recipient_id, event, \
                   created_at, delivered_at, failed_at, failure \
            FROM notifications \
            WHERE delivered_at IS NULL \
              AND failed_at IS NULL \
            ORDER BY created_at ASC \
            LIMIT $1::INT4 \
            FOR UPDATE SKIP LOCKED";
        Ok(self
            .query(SQL, &[&limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let Json(event) = row.get::<_, Json<Event>>("event");
                Notification {
                    id: row.get("id"),
                    recipient_id: row.get("recipient_id"),
                    event,
                    created_at: row.get("created_at"),
                    delivered_at: row.get("delivered_at"),
                    failed_at: row.get("failed_at"),
                    failure: row.get("failure"),
                }
            })
            .collect())
    }
}
