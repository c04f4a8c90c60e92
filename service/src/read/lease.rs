//! [`Lease`] read model definition.

#[cfg(doc)]
use crate::domain::Lease;

/// Wrapper around [`Lease`] indicating that it [`is_active()`].
///
/// [`is_active()`]: Lease::is_active
#[derive(Clone, Debug)]
pub struct Active<T>(pub T);
