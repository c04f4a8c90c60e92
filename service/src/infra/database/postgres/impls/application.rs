//! [`Application`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        application::{self, Applicant},
        property, Application,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of the `applications` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, property_id, tenant_id, status, \
    full_name, email, phone, national_id, passport_number, message, \
    offer_amount, move_in_date, rejection_reason, reviewed_by, \
    created_at, updated_at";

/// Maps the provided [`Row`] of the `applications` table into an
/// [`Application`].
fn from_row(row: &Row) -> Application {
    Application {
        id: row.get("id"),
        property_id: row.get("property_id"),
        tenant_id: row.get("tenant_id"),
        status: row.get("status"),
        applicant: Applicant {
            full_name: row.get("full_name"),
            email: row.get("email"),
            phone: row.get("phone"),
            national_id: row.get("national_id"),
            passport_number: row.get("passport_number"),
            message: row.get("message"),
        },
        offer_amount: row.get("offer_amount"),
        move_in_date: row.get("move_in_date"),
        rejection_reason: row.get("rejection_reason"),
        reviewed_by: row.get("reviewed_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Application>, application::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Application>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: application::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
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

impl<C> Database<Select<By<Vec<Application>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Application>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let property_id: property::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM applications \
             WHERE property_id = $1::UUID \
             ORDER BY created_at ASC, id ASC",
        );
        Ok(self
            .query(&sql, &[&property_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Application>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(application): Insert<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(application)).await
    }
}

impl<C> Database<Update<Application>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(application): Update<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        let Application {
            id,
            property_id,
            tenant_id,
            status,
            applicant:
                Applicant {
                    full_name,
                    email,
                    phone,
                    national_id,
                    passport_number,
                    message,
                },
            offer_amount,
            move_in_date,
            rejection_reason,
            reviewed_by,
            created_at,
            updated_at,
        } = application;

        const SQL: &str = "\
            INSERT INTO applications (\
                id, property_id, tenant_id, status, \
                full_name, email, phone, national_id, passport_number, \
                message, \
                offer_amount, move_in_date, rejection_reason, reviewed_by, \
                created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::INT2, \
                $5::VARCHAR, $6::VARCHAR, $7::VARCHAR, $8::VARCHAR, \
                $9::VARCHAR, \
                $10::TEXT, \
                $11::NUMERIC, $12::DATE, $13::VARCHAR, $14::UUID, \
                $15::TIMESTAMPTZ, $16::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                full_name = EXCLUDED.full_name, \
                email = EXCLUDED.email, \
                phone = EXCLUDED.phone, \
                national_id = EXCLUDED.national_id, \
                passport_number = EXCLUDED.passport_number, \
                message = EXCLUDED.message, \
                offer_amount = EXCLUDED.offer_amount, \
                move_in_date = EXCLUDED.move_in_date, \
                rejection_reason = EXCLUDED.rejection_reason, \
                reviewed_by = EXCLUDED.reviewed_by, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &property_id,
                &tenant_id,
                &status,
                &full_name,
                &email,
                &phone,
                &national_id,
                &passport_number,
                &message,
                &offer_amount,
                &move_in_date,
                &rejection_reason,
                &reviewed_by,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Application, application::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Application, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: application::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM applications \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
