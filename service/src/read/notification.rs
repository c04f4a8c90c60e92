//! [`Notification`] read model definition.

#[cfg(doc)]
use crate::domain::Notification;

/// Selector of the oldest [`Notification`]s awaiting delivery.
///
/// Selected [`Notification`]s are locked until the end of the transaction,
/// while the ones already locked by other transactions are skipped.
#[derive(Clone, Copy, Debug)]
pub struct Undelivered {
    /// Maximum number of [`Notification`]s to select.
    pub limit: u16,
}
