//! [`Lease`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use postgres_types::Json;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        application,
        lease::{self, ChequeCount, ContractDocument, PaymentPlan, Termination},
        property, Lease,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::lease::Active,
};

/// Columns of the `leases` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, application_id, previous_lease_id, property_id, tenant_id, owner_id, \
    start_date, end_date, rent_amount, security_deposit, status, \
    ejari_number, ejari_status, \
    contract_url, contract_uploaded_by, contract_uploaded_at, \
    cheque_count, payment_method, payment_plan, \
    termination_reason, move_out_inspection, terminated_at, \
    created_at, updated_at";

/// Maps the provided [`Row`] of the `leases` table into a [`Lease`].
fn from_row(row: &Row) -> Lease {
    let contract = match (
        row.get("contract_url"),
        row.get("contract_uploaded_by"),
        row.get("contract_uploaded_at"),
    ) {
        (Some(url), Some(uploaded_by), Some(uploaded_at)) => {
            Some(ContractDocument {
                url,
                uploaded_by,
                uploaded_at,
            })
        }
        _ => None,
    };
    let termination = row
        .get::<_, Option<_>>("terminated_at")
        .map(|terminated_at| Termination {
            reason: row.get("termination_reason"),
            move_out_inspection: row.get("move_out_inspection"),
            terminated_at,
        });

    Lease {
        id: row.get("id"),
        application_id: row.get("application_id"),
        previous_lease_id: row.get("previous_lease_id"),
        property_id: row.get("property_id"),
        tenant_id: row.get("tenant_id"),
        owner_id: row.get("owner_id"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        rent_amount: row.get("rent_amount"),
        security_deposit: row.get("security_deposit"),
        status: row.get("status"),
        ejari_number: row.get("ejari_number"),
        ejari_status: row.get("ejari_status"),
        contract,
        cheque_count: row
            .get::<_, Option<i16>>("cheque_count")
            .and_then(|c| u8::try_from(c).ok())
            .and_then(ChequeCount::new),
        payment_method: row.get("payment_method"),
        payment_plan: row
            .get::<_, Option<Json<PaymentPlan>>>("payment_plan")
            .map(|Json(plan)| plan),
        termination,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Lease>, lease::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Lease>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Lease>, lease::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: lease::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM leases \
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

impl<C> Database<Select<By<Option<Active<Lease>>, property::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Active<Lease>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Active<Lease>>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let property_id: property::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM leases \
             WHERE property_id = $1::UUID \
               AND status = $2::INT2",
        );
        Ok(self
            .query_opt(&sql, &[&property_id, &lease::Status::Active])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .map(Active))
    }
}

impl<C> Database<Select<By<Option<Lease>, application::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Lease>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Lease>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let application_id: application::Id = by.into_inner();

        // Renewals share the `application_id`, so the latest one wins.
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM leases \
             WHERE application_id = $1::UUID \
             ORDER BY created_at DESC \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&application_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Lease>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(lease): Insert<Lease>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(lease)).await
    }
}

impl<C> Database<Update<Lease>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(lease): Update<Lease>,
    ) -> Result<Self::Ok, Self::Err> {
        let Lease {
            id,
            application_id,
            previous_lease_id,
            property_id,
            tenant_id,
            owner_id,
            start_date,
            end_date,
            rent_amount,
            security_deposit,
            status,
            ejari_number,
            ejari_status,
            contract,
            cheque_count,
            payment_method,
            payment_plan,
            termination,
            created_at,
            updated_at,
        } = lease;
        let (contract_url, contract_uploaded_by, contract_uploaded_at) =
            contract.map_or((None, None, None), |c| {
                (Some(c.url), Some(c.uploaded_by), Some(c.uploaded_at))
            });
        let (termination_reason, move_out_inspection, terminated_at) =
            termination.map_or((None, None, None), |t| {
                (t.reason, t.move_out_inspection, Some(t.terminated_at))
            });
        let cheque_count = cheque_count.map(|c| i16::from(c.get()));
        let payment_plan = payment_plan.map(Json);

        const SQL: &str = "\
            INSERT INTO leases (\
                id, application_id, previous_lease_id, \
                property_id, tenant_id, owner_id, \
                start_date, end_date, rent_amount, security_deposit, status, \
                ejari_number, ejari_status, \
                contract_url, contract_uploaded_by, contract_uploaded_at, \
                cheque_count, payment_method, payment_plan, \
                termination_reason, move_out_inspection, terminated_at, \
                created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::UUID, $5::UUID, $6::UUID, \
                $7::DATE, $8::DATE, $9::NUMERIC, $10::NUMERIC, $11::INT2, \
                $12::VARCHAR, $13::VARCHAR, \
                $14::VARCHAR, $15::UUID, $16::TIMESTAMPTZ, \
                $17::INT2, $18::INT2, $19::JSONB, \
                $20::VARCHAR, $21::TEXT, $22::TIMESTAMPTZ, \
                $23::TIMESTAMPTZ, $24::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET end_date = EXCLUDED.end_date, \
                rent_amount = EXCLUDED.rent_amount, \
                security_deposit = EXCLUDED.security_deposit, \
                status = EXCLUDED.status, \
                ejari_number = EXCLUDED.ejari_number, \
                ejari_status = EXCLUDED.ejari_status, \
                contract_url = EXCLUDED.contract_url, \
                contract_uploaded_by = EXCLUDED.contract_uploaded_by, \
                contract_uploaded_at = EXCLUDED.contract_uploaded_at, \
                cheque_count = EXCLUDED.cheque_count, \
                payment_method = EXCLUDED.payment_method, \
                payment_plan = EXCLUDED.payment_plan, \
                termination_reason = EXCLUDED.termination_reason, \
                move_out_inspection = EXCLUDED.move_out_inspection, \
                terminated_at = EXCLUDED.terminated_at, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &application_id,
                &previous_lease_id,
                &property_id,
                &tenant_id,
                &owner_id,
                &start_date,
                &end_date,
                &rent_amount,
                &security_deposit,
                &status,
                &ejari_number,
                &ejari_status,
                &contract_url,
                &contract_uploaded_by,
                &contract_uploaded_at,
                &cheque_count,
                &payment_method,
                &payment_plan,
                &termination_reason,
                &move_out_inspection,
                &terminated_at,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Lease, lease::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Lease, lease::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: lease::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM leases \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
