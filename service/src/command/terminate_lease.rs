//! [`Command`] for terminating a [`Lease`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        lease, notification::LeaseAction, property, user, Lease, Notification,
        Property, RentPayment,
    },
    infra::{database, Database},
    Service,
};

use super::{lifecycle, Command};

/// [`Command`] for terminating an active [`Lease`], vacating its
/// [`Property`] and cancelling its outstanding [`RentPayment`]s.
#[derive(Clone, Debug)]
pub struct TerminateLease {
    /// ID of the [`Lease`] to terminate.
    pub lease_id: lease::Id,

    /// Owner or admin terminating the [`Lease`].
    pub initiator: user::Initiator,

    /// [`Reason`] of the termination, if any.
    ///
    /// [`Reason`]: lease::Reason
    pub reason: Option<lease::Reason>,

    /// Notes of the move-out [`Inspection`], if any.
    ///
    /// [`Inspection`]: lease::Inspection
    pub move_out_inspection: Option<lease::Inspection>,
}

impl<Db> Command<TerminateLease> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Lease>, lease::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Lease, lease::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Lease>, lease::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<RentPayment>, lease::Id>>,
            Ok = Vec<RentPayment>,
            Err = Traced<database::Error>,
        > + Database<Update<Property>, Err = Traced<database::Error>>
        + Database<Update<Lease>, Err = Traced<database::Error>>
        + Database<Update<RentPayment>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Lease;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: TerminateLease,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TerminateLease {
            lease_id,
            initiator,
            reason,
            move_out_inspection,
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
        let property_id = lease.property_id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Property, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        // Avoid terminating the same `Lease` twice.
        tx.execute(Lock(By::<Lease, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut property = tx
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        let mut lease = tx
            .execute(Select(By::<Option<Lease>, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LeaseNotExists(lease_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let reason_text = reason.as_ref().map(ToString::to_string);
        lease
            .terminate(reason, move_out_inspection, now.coerce())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Update(lease.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let cancelled =
            lifecycle::cancel_outstanding_payments(&tx, lease_id, now)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if property.current_lease_id() == Some(lease_id) {
            property.vacate(now.coerce());
            tx.execute(Update(property.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        lifecycle::notify_about_lease(
            &tx,
            LeaseAction::Terminated,
            &lease,
            &property,
            reason_text,
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Lease(id: {lease_id})` terminated, \
             {cancelled} outstanding payment(s) cancelled",
        );

        Ok(lease)
    }
}

/// Error of [`TerminateLease`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Lease`] is not active.
    #[display("{_0}")]
    #[from]
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
}
