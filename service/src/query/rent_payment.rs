//! [`Query`] collection related to [`RentPayment`]s.

use common::operations::By;

use crate::domain::{lease, rent_payment, RentPayment};
#[cfg(doc)]
use crate::{domain::Lease, Query};

use super::DatabaseQuery;

/// Queries a [`RentPayment`] by its [`rent_payment::Id`].
pub type ById = DatabaseQuery<By<Option<RentPayment>, rent_payment::Id>>;

/// Queries the installment schedule of a [`Lease`], ordered by installment
/// number.
pub type OfLease = DatabaseQuery<By<Vec<RentPayment>, lease::Id>>;
