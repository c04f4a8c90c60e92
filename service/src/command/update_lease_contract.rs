//! [`Command`] for updating contract details of a [`Lease`].

use common::{
    operations::{
        By, Commit, Delete, Insert, Lock, Select, Transact, Transacted, Update,
    },
    Date, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        lease::{self, ContractDocument},
        notification::LeaseAction,
        property,
        rent_payment::{self, schedule},
        user, Lease, Notification, Property, RentPayment,
    },
    infra::{database, Database},
    Service,
};

use super::{lifecycle, Command};

/// [`Command`] for updating contract details of an active [`Lease`].
///
/// Providing a `cheque_count` replaces the whole [`RentPayment`] schedule of
/// the [`Lease`].
#[derive(Clone, Debug)]
pub struct UpdateLeaseContract {
    /// ID of the [`Lease`] to update.
    pub lease_id: lease::Id,

    /// Owner or admin updating the [`Lease`].
    pub initiator: user::Initiator,

    /// URL of the uploaded contract document.
    pub contract_url: Option<lease::DocumentUrl>,

    /// Number of cheques to split the rent into.
    pub cheque_count: Option<u8>,

    /// [`PaymentMethod`] of the installments.
    ///
    /// [`PaymentMethod`]: lease::PaymentMethod
    pub payment_method: Option<lease::PaymentMethod>,

    /// Due [`Date`] of the first installment.
    ///
    /// Defaults to the start of the [`Lease`].
    pub first_due_date: Option<Date>,

    /// Ejari registration number.
    pub ejari_number: Option<lease::EjariNumber>,

    /// Ejari registration status.
    pub ejari_status: Option<lease::EjariStatus>,
}

impl<Db> Command<UpdateLeaseContract> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Lease>, lease::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Lease, lease::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Lease>, lease::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Vec<RentPayment>, lease::Id>>,
            Ok = u64,
            Err = Traced<database::Error>,
        > + Database<Insert<Vec<RentPayment>>, Err = Traced<database::Error>>
        + Database<Update<Lease>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Lease;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateLeaseContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateLeaseContract {
            lease_id,
            initiator,
            contract_url,
            cheque_count,
            payment_method,
            first_due_date,
            ejari_number,
            ejari_status,
        } = cmd;

        let lease = self
            .database()
            .execute(Select(By::<Option<Lease>, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LeaseNotExists(lease_id))
            .map_err(tracerr::wrap!())?;
        if !lease.is_managed_by(initiator) {
            return Err(tracerr::new!(E::NotPropertyManager(initiator.id)));
        }
        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(lease.property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(lease.property_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid overlapping schedules of the same `Lease`.
        tx.execute(Lock(By::<Lease, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut lease = tx
            .execute(Select(By::<Option<Lease>, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LeaseNotExists(lease_id))
            .map_err(tracerr::wrap!())?;
        if !lease.is_active() {
            return Err(tracerr::new!(E::LeaseNotActive(lease::NotActive {
                id: lease_id,
                status: lease.status(),
            })));
        }

        let now = DateTime::now();

        if let Some(url) = contract_url {
            if lease.contract.as_ref().map(|c| &c.url) != Some(&url) {
                lease.contract = Some(ContractDocument {
                    url,
                    uploaded_by: initiator.id,
                    uploaded_at: now.coerce(),
                });
            }
        }
        if let Some(number) = ejari_number {
            lease.ejari_number = Some(number);
        }
        if let Some(status) = ejari_status {
            lease.ejari_status = Some(status);
        }
        if let Some(method) = payment_method {
            lease.payment_method = Some(method);
            if let Some(plan) = &mut lease.payment_plan {
                plan.payment_method = Some(method);
            }
        }

        if let Some(count) = cheque_count {
            let schedule = schedule(
                lease.rent_amount,
                count,
                first_due_date.unwrap_or(lease.start_date),
                lease.end_date,
            )
            .map_err(tracerr::from_and_wrap!(=> E))?;

            let replaced = tx
                .execute(Delete(By::<Vec<RentPayment>, _>::new(lease_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            log::debug!(
                "{replaced} rent payment(s) of `Lease(id: {lease_id})` are \
                 replaced",
            );

            lease.cheque_count = Some(schedule.cheque_count());
            lease.payment_plan = Some(schedule.plan(lease.payment_method));
            tx.execute(Insert(schedule.into_rent_payments(lease_id, now)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        lease.updated_at = now.coerce();
        tx.execute(Update(lease.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        lifecycle::notify_about_lease(
            &tx,
            LeaseAction::Updated,
            &lease,
            &property,
            None,
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Lease(id: {lease_id})` contract updated");

        Ok(lease)
    }
}

/// Error of [`UpdateLeaseContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Lease`] is not active.
    #[display("{_0}")]
    LeaseNotActive(lease::NotActive),

    /// [`Lease`] with the provided ID does not exist.
    #[display("`Lease(id: {_0})` does not exist")]
    LeaseNotExists(#[error(not(source))] lease::Id),

    /// Initiator manages neither the [`Property`] nor the platform.
    #[display("`User(id: {_0})` is not allowed to manage this lease")]
    NotPropertyManager(#[error(not(source))] user::Id),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// Installment schedule cannot be computed.
    #[display("Invalid payment schedule: {_0}")]
    #[from]
    Schedule(rent_payment::schedule::Error),
}

#[cfg(test)]
mod spec {
    use common::{Date, Money};

    use crate::{
        command::TerminateLease,
        domain::{lease, rent_payment, user},
        infra::database::memory,
        Command as _,
    };

    use super::{ExecutionError as E, UpdateLeaseContract};

    fn update(
        lease_id: lease::Id,
        initiator: user::Initiator,
    ) -> UpdateLeaseContract {
        UpdateLeaseContract {
            lease_id,
            initiator,
            contract_url: None,
            cheque_count: None,
            payment_method: None,
            first_due_date: None,
            ejari_number: None,
            ejari_status: None,
        }
    }

    fn date(y: i32, m: u8, d: u8) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn schedules_installments() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "100000").await;

        let updated = svc
            .execute(UpdateLeaseContract {
                cheque_count: Some(6),
                payment_method: Some(lease::PaymentMethod::Cheque),
                ..update(lease.id, owner)
            })
            .await
            .unwrap();

        let plan = updated.payment_plan.unwrap();
        assert_eq!(plan.cheque_count.get(), 6);
        assert_eq!(plan.interval_months, 2);
        assert_eq!(plan.payment_method, Some(lease::PaymentMethod::Cheque));
        assert_eq!(plan.first_due_date, lease.start_date);
        assert_eq!(plan.total, "100000".parse::<Money>().unwrap());

        let state = db.snapshot();
        let payments = state.payments_of(lease.id);
        assert_eq!(payments.len(), 6);
        assert!(payments
            .iter()
            .all(|p| p.status() == rent_payment::Status::Pending));
        assert_eq!(
            payments.iter().map(|p| p.amount).sum::<Money>(),
            "100000".parse::<Money>().unwrap(),
        );
        assert_eq!(payments[0].amount, "16666.66".parse::<Money>().unwrap());
        assert_eq!(payments[5].amount, "16666.70".parse::<Money>().unwrap());
        assert_eq!(payments[1].due_date, date(2025, 3, 1));
        assert_eq!(payments[5].due_date, date(2025, 11, 1));
    }

    #[tokio::test]
    async fn replaces_previous_schedule() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;
        _ = svc
            .execute(UpdateLeaseContract {
                cheque_count: Some(12),
                ..update(lease.id, owner)
            })
            .await
            .unwrap();

        _ = svc
            .execute(UpdateLeaseContract {
                cheque_count: Some(2),
                first_due_date: Some(date(2025, 9, 1)),
                ..update(lease.id, owner)
            })
            .await
            .unwrap();

        let state = db.snapshot();
        let payments = state.payments_of(lease.id);
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].due_date, date(2025, 9, 1));
        // Clamped to the lease end.
        assert_eq!(payments[1].due_date, lease.end_date);
        assert_eq!(
            state.lease(lease.id).cheque_count.map(lease::ChequeCount::get),
            Some(2),
        );
    }

    #[tokio::test]
    async fn keeps_schedule_on_unsupported_cheque_count() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;
        _ = svc
            .execute(UpdateLeaseContract {
                cheque_count: Some(4),
                ..update(lease.id, owner)
            })
            .await
            .unwrap();

        let err = svc
            .execute(UpdateLeaseContract {
                cheque_count: Some(3),
                ..update(lease.id, owner)
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::Schedule(_)));
        assert_eq!(db.snapshot().payments_of(lease.id).len(), 4);
    }

    #[tokio::test]
    async fn records_contract_and_ejari() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;

        let updated = svc
            .execute(UpdateLeaseContract {
                contract_url: lease::DocumentUrl::new(
                    "https://files.example.com/contracts/1204.pdf",
                ),
                ejari_number: lease::EjariNumber::new("EJ-2025-000123"),
                ejari_status: lease::EjariStatus::new("registered"),
                ..update(lease.id, owner)
            })
            .await
            .unwrap();

        let contract = updated.contract.unwrap();
        assert_eq!(contract.uploaded_by, owner.id);
        assert_eq!(
            updated.ejari_number,
            lease::EjariNumber::new("EJ-2025-000123"),
        );
        assert!(updated.payment_plan.is_none());
        assert!(db.snapshot().payments_of(lease.id).is_empty());
    }

    #[tokio::test]
    async fn refuses_terminated_lease() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;
        _ = svc
            .execute(TerminateLease {
                lease_id: lease.id,
                initiator: owner,
                reason: None,
                move_out_inspection: None,
            })
            .await
            .unwrap();

        let err = svc
            .execute(UpdateLeaseContract {
                cheque_count: Some(1),
                ..update(lease.id, owner)
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::LeaseNotActive(_)));
    }
}
