//! [`RentPayment`]-related [`Database`] implementations.

use common::{
    operations::{By, Delete, Insert, Select, Update},
    Date,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{lease, rent_payment, RentPayment},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::rent_payment::Overdue,
};

/// Columns of the `rent_payments` table, in the order [`from_row()`]
/// expects.
const COLUMNS: &str = "\
    id, lease_id, installment_number, due_date, amount, status, paid_at, \
    created_at, updated_at";

/// Maps the provided [`Row`] of the `rent_payments` table into a
/// [`RentPayment`].
fn from_row(row: &Row) -> RentPayment {
    RentPayment {
        id: row.get("id"),
        lease_id: row.get("lease_id"),
        installment_number: row.get("installment_number"),
        due_date: row.get("due_date"),
        amount: row.get("amount"),
        status: row.get("status"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<RentPayment>, rent_payment::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<RentPayment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<RentPayment>, rent_payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: rent_payment::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM rent_payments \
             WHERE id = $1::UUID",
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<RentPayment>, lease::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<RentPayment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<RentPayment>, lease::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let lease_id: lease::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM rent_payments \
             WHERE lease_id = $1::UUID \
             ORDER BY installment_number ASC",
        );
        Ok(self
            .query(&sql, &[&lease_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Vec<RentPayment>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payments): Insert<Vec<RentPayment>>,
    ) -> Result<Self::Ok, Self::Err> {
        for payment in payments {
            self.execute(Update(payment))
                .await
                .map_err(tracerr::wrap!())?;
        }
        Ok(())
    }
}

impl<C> Database<Update<RentPayment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(payment): Update<RentPayment>,
    ) -> Result<Self::Ok, Self::Err> {
        let RentPayment {
            id,
            lease_id,
            installment_number,
            due_date,
            amount,
            status,
            paid_at,
            created_at,
            updated_at,
        } = payment;

        const SQL: &str = "\
            INSERT INTO rent_payments (\
                id, lease_id, installment_number, due_date, amount, status, \
                paid_at, created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::DATE, $5::NUMERIC, \
                $6::INT2, \
                $7::TIMESTAMPTZ, $8::TIMESTAMPTZ, $9::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                paid_at = EXCLUDED.paid_at, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &lease_id,
                &installment_number,
                &due_date,
                &amount,
                &status,
                &paid_at,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Vec<RentPayment>, lease::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Vec<RentPayment>, lease::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let lease_id: lease::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM rent_payments \
            WHERE lease_id = $1::UUID";
        self.exec(SQL, &[&lease_id])
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<By<Overdue, Date>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<Overdue, Date>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let today: Date = by.into_inner();

        const SQL: &str = "\
            UPDATE rent_payments AS p \
            SET status = $2::INT2, \
                updated_at = NOW() \
            FROM leases AS l \
            WHERE l.id = p.lease_id \
              AND l.status = $3::INT2 \
              AND p.status IN ($4::INT2, $5::INT2) \
              AND p.due_date < $1::DATE";
        self.exec(
            SQL,
            &[
                &today,
                &rent_payment::Status::Overdue,
                &lease::Status::Active,
                &rent_payment::Status::Pending,
                &rent_payment::Status::Partial,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
    }
}
