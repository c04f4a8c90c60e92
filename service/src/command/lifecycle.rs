//! Steps shared by the tenancy lifecycle [`Command`]s.
//!
//! Every step runs inside an already started transaction, holding the locks
//! its caller has acquired in the `property → application → lease` order.
//!
//! [`Command`]: super::Command

use common::{
    operations::{By, Insert, Select, Update},
    DateTime,
};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        lease,
        notification::{Event, LeaseAction, LeaseNotification},
        user, Lease, Notification, Property, RentPayment,
    },
    infra::{database, Database},
};

/// Queues a new [`Notification`] about the provided [`Event`] for every
/// provided recipient.
///
/// # Errors
///
/// If failed to insert a [`Notification`].
pub(crate) async fn notify<Tx>(
    tx: &Tx,
    recipients: impl IntoIterator<Item = user::Id>,
    event: Event,
) -> Result<(), Traced<database::Error>>
where
    Tx: Database<Insert<Notification>, Err = Traced<database::Error>>,
{
    for recipient_id in recipients {
        log::debug!(
            "queueing `{}` notification for `User(id: {recipient_id})`",
            event.name(),
        );
        tx.execute(Insert(Notification::new(recipient_id, event.clone())))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;
    }
    Ok(())
}

/// Queues a [`LeaseNotification`] about the provided [`Lease`] for its
/// tenant and owner.
///
/// # Errors
///
/// If failed to insert a [`Notification`].
pub(crate) async fn notify_about_lease<Tx>(
    tx: &Tx,
    action: LeaseAction,
    lease: &Lease,
    property: &Property,
    reason: Option<String>,
) -> Result<(), Traced<database::Error>>
where
    Tx: Database<Insert<Notification>, Err = Traced<database::Error>>,
{
    let mut payload =
        LeaseNotification::new(action, lease, property.name.clone());
    payload.reason = reason;
    if let Some(plan) = &lease.payment_plan {
        payload.cheque_count = Some(plan.cheque_count);
        payload.first_due_date = Some(plan.first_due_date);
    }
    notify(tx, [lease.tenant_id, lease.owner_id], Event::Lease(payload))
        .await
        .map_err(tracerr::wrap!())
}

/// Cancels every outstanding [`RentPayment`] of the [`Lease`] with the
/// provided ID.
///
/// Returns the number of cancelled [`RentPayment`]s.
///
/// # Errors
///
/// If failed to select or update [`RentPayment`]s.
pub(crate) async fn cancel_outstanding_payments<Tx>(
    tx: &Tx,
    lease_id: lease::Id,
    at: DateTime,
) -> Result<usize, Traced<database::Error>>
where
    Tx: Database<
            Select<By<Vec<RentPayment>, lease::Id>>,
            Ok = Vec<RentPayment>,
            Err = Traced<database::Error>,
        > + Database<Update<RentPayment>, Err = Traced<database::Error>>,
{
    let payments = tx
        .execute(Select(By::<Vec<RentPayment>, _>::new(lease_id)))
        .await
        .map_err(tracerr::wrap!())?;

    let mut cancelled = 0;
    for mut payment in payments {
        if payment.cancel(at.coerce()) {
            tx.execute(Update(payment))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
            cancelled += 1;
        }
    }
    Ok(cancelled)
}
