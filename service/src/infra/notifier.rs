//! [`Notifier`]-related implementations.

use common::operations::Deliver;
use tracing as log;

use crate::domain::Notification;

/// Sink delivering [`Notification`]s to their recipients.
pub use common::Handler as Notifier;

/// [`Notifier`] rendering [`Notification`]s into structured log records.
///
/// Stands in for an email or SMS gateway.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Notifier<Deliver<Notification>> for Log {
    type Ok = ();
    type Err = serde_json::Error;

    async fn execute(
        &self,
        Deliver(notification): Deliver<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let payload = serde_json::to_string(&notification.event)?;
        log::info!(
            notification.id = %notification.id,
            notification.recipient = %notification.recipient_id,
            notification.event = notification.event.name(),
            property = %notification.event.property_name(),
            "{payload}",
        );
        Ok(())
    }
}
