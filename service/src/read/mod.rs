//! Read entities definitions.

pub mod lease;
pub mod notification;
pub mod rent_payment;
