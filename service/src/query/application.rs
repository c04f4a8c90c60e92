//! [`Query`] collection related to [`Application`]s.

use common::operations::By;

use crate::domain::{application, property, Application};
#[cfg(doc)]
use crate::{domain::Property, Query};

use super::DatabaseQuery;

/// Queries an [`Application`] by its [`application::Id`].
pub type ById = DatabaseQuery<By<Option<Application>, application::Id>>;

/// Queries all [`Application`]s of a [`Property`], oldest first.
pub type OfProperty = DatabaseQuery<By<Vec<Application>, property::Id>>;
