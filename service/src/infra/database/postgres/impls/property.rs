//! [`Property`]-related [`Database`] implementations.

use common::operations::{By, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{property, Property},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Property>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, owner_id, name, status, current_lease_id, price, \
                   created_at, updated_at \
            FROM properties \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Property {
                id: row.get("id"),
                owner_id: row.get("owner_id"),
                name: row.get("name"),
                status: row.get("status"),
                current_lease_id: row.get("current_lease_id"),
                price: row.get("price"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            }))
    }
}

impl<C> Database<Update<Property>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(property): Update<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        let Property {
            id,
            owner_id,
            name,
            status,
            current_lease_id,
            price,
            created_at,
            updated_at,
        } = property;

        const SQL: &str = "\
            INSERT INTO properties (\
                id, owner_id, name, status, current_lease_id, price, \
                created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::INT2, $5::UUID, \
                $6::NUMERIC, \
                $7::TIMESTAMPTZ, $8::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET owner_id = EXCLUDED.owner_id, \
                name = EXCLUDED.name, \
                status = EXCLUDED.status, \
                current_lease_id = EXCLUDED.current_lease_id, \
                price = EXCLUDED.price, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &owner_id,
                &name,
                &status,
                &current_lease_id,
                &price,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Property, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM properties \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
