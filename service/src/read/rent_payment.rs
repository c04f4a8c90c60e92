//! [`RentPayment`] read model definition.

#[cfg(doc)]
use crate::domain::{Lease, RentPayment};

/// Marker of outstanding [`RentPayment`]s of active [`Lease`]s which are not
/// settled by their due date.
///
/// Used as `Update<By<Overdue, Date>>` marking every such [`RentPayment`] due
/// before the provided [`Date`] as overdue.
///
/// [`Date`]: common::Date
#[derive(Clone, Copy, Debug)]
pub struct Overdue;
