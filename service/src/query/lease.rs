//! [`Query`] collection related to [`Lease`]s.

use common::operations::By;

use crate::{
    domain::{application, lease, property, Lease},
    read::lease::Active,
};
#[cfg(doc)]
use crate::{
    domain::{Application, Property},
    Query,
};

use super::DatabaseQuery;

/// Queries a [`Lease`] by its [`lease::Id`].
pub type ById = DatabaseQuery<By<Option<Lease>, lease::Id>>;

/// Queries the [`Active`] [`Lease`] of a [`Property`], if any.
pub type ActiveOfProperty =
    DatabaseQuery<By<Option<Active<Lease>>, property::Id>>;

/// Queries the latest [`Lease`] of an approved [`Application`], if any.
///
/// Renewals keep the `application_id` of the renewed [`Lease`], so this is
/// the last [`Lease`] of the renewal chain rather than the one opened on
/// approval.
pub type OfApplication = DatabaseQuery<By<Option<Lease>, application::Id>>;
