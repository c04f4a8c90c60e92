//! Marker types of the moments an entity goes through.
//!
//! Used as the `Of` parameter of a [`DateTimeOf`], so that, for example, the
//! creation and the termination timestamps of the same lease cannot be mixed
//! up.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing a document upload.
#[derive(Clone, Copy, Debug)]
pub struct Upload;

/// Marker type describing an early end of a tenancy.
#[derive(Clone, Copy, Debug)]
pub struct Termination;

/// Marker type describing a settlement of an installment.
#[derive(Clone, Copy, Debug)]
pub struct Payment;

/// Marker type describing a successful delivery of a message.
#[derive(Clone, Copy, Debug)]
pub struct Delivery;

/// Marker type describing a failed delivery of a message.
#[derive(Clone, Copy, Debug)]
pub struct Failure;

/// Marker type describing an expiration of a credential.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;
