//! [`Command`] for updating the status of a [`RentPayment`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{lease, rent_payment, user, Lease, RentPayment},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a settlement of a [`RentPayment`] on behalf of
/// an owner or an admin.
#[derive(Clone, Copy, Debug)]
pub struct UpdateRentPaymentStatus {
    /// ID of the [`RentPayment`] to update.
    pub rent_payment_id: rent_payment::Id,

    /// Owner or admin updating the [`RentPayment`].
    pub initiator: user::Initiator,

    /// New [`Status`] of the [`RentPayment`].
    ///
    /// [`Status`]: rent_payment::Status
    pub status: rent_payment::Status,
}

impl<Db> Command<UpdateRentPaymentStatus> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<RentPayment>, rent_payment::Id>>,
            Ok = Option<RentPayment>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Lease>, lease::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<Lock<By<Lease, lease::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<RentPayment>, rent_payment::Id>>,
            Ok = Option<RentPayment>,
            Err = Traced<database::Error>,
        > + Database<Update<RentPayment>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = RentPayment;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateRentPaymentStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateRentPaymentStatus {
            rent_payment_id,
            initiator,
            status,
        } = cmd;

        let payment = self
            .database()
            .execute(Select(By::<Option<RentPayment>, _>::new(rent_payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::RentPaymentNotExists(rent_payment_id))
            .map_err(tracerr::wrap!())?;
        let lease_id = payment.lease_id;

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

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid racing with schedule replacement and termination.
        tx.execute(Lock(By::<Lease, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut payment = tx
            .execute(Select(By::<Option<RentPayment>, _>::new(rent_payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::RentPaymentNotExists(rent_payment_id))
            .map_err(tracerr::wrap!())?;

        payment
            .set_status(status, DateTime::now().coerce())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Update(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`RentPayment(id: {rent_payment_id})` is now `{status}`");

        Ok(payment)
    }
}

/// Error of [`UpdateRentPaymentStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Lease`] with the provided ID does not exist.
    #[display("`Lease(id: {_0})` does not exist")]
    LeaseNotExists(#[error(not(source))] lease::Id),

    /// Initiator manages neither the [`Lease`] nor the platform.
    #[display("`User(id: {_0})` is not allowed to manage this lease")]
    NotPropertyManager(#[error(not(source))] user::Id),

    /// [`RentPayment`] with the provided ID does not exist.
    #[display("`RentPayment(id: {_0})` does not exist")]
    RentPaymentNotExists(#[error(not(source))] rent_payment::Id),

    /// [`RentPayment`] cannot move into the requested status.
    #[display("{_0}")]
    #[from]
    Transition(rent_payment::TransitionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::UpdateLeaseContract,
        domain::{rent_payment, user, Lease},
        infra::database::memory::{self, Memory},
        Command as _, Service,
    };

    use super::{ExecutionError as E, UpdateRentPaymentStatus};

    async fn scheduled(
        svc: &Service<Memory>,
        owner: user::Initiator,
    ) -> (Lease, rent_payment::Id) {
        let lease = memory::leased(svc, owner, "120000").await;
        _ = svc
            .execute(UpdateLeaseContract {
                lease_id: lease.id,
                initiator: owner,
                contract_url: None,
                cheque_count: Some(1),
                payment_method: None,
                first_due_date: None,
                ejari_number: None,
                ejari_status: None,
            })
            .await
            .unwrap();
        let payment = svc.database().snapshot().payments_of(lease.id)[0].id;
        (lease, payment)
    }

    fn set(
        rent_payment_id: rent_payment::Id,
        initiator: user::Initiator,
        status: rent_payment::Status,
    ) -> UpdateRentPaymentStatus {
        UpdateRentPaymentStatus {
            rent_payment_id,
            initiator,
            status,
        }
    }

    #[tokio::test]
    async fn records_partial_then_full_payment() {
        use rent_payment::Status as S;

        let svc = memory::service();
        let owner = svc.database().user(user::Role::Owner);
        let (_, payment) = scheduled(&svc, owner).await;

        let partial =
            svc.execute(set(payment, owner, S::Partial)).await.unwrap();
        assert_eq!(partial.status(), S::Partial);
        assert!(partial.paid_at.is_none());

        let paid = svc.execute(set(payment, owner, S::Paid)).await.unwrap();
        assert_eq!(paid.status(), S::Paid);
        assert!(paid.paid_at.is_some());
    }

    #[tokio::test]
    async fn refuses_reopening_paid_payment() {
        use rent_payment::Status as S;

        let svc = memory::service();
        let owner = svc.database().user(user::Role::Owner);
        let (_, payment) = scheduled(&svc, owner).await;
        _ = svc.execute(set(payment, owner, S::Paid)).await.unwrap();

        for status in [S::Pending, S::Overdue, S::Cancelled] {
            let err = svc
                .execute(set(payment, owner, status))
                .await
                .unwrap_err();
            assert!(matches!(err.into_inner(), E::Transition(_)));
        }
    }

    #[tokio::test]
    async fn tenants_cannot_confirm_payments() {
        let svc = memory::service();
        let owner = svc.database().user(user::Role::Owner);
        let (lease, payment) = scheduled(&svc, owner).await;
        let tenant = user::Initiator {
            id: lease.tenant_id,
            role: user::Role::Tenant,
        };

        let err = svc
            .execute(set(payment, tenant, rent_payment::Status::Paid))
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::NotPropertyManager(_)));
    }
}
