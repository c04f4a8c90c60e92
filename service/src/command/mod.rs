//! [`Command`] definition.

pub mod authorize_user_session;
pub mod cancel_application;
pub mod create_lease;
mod lifecycle;
pub mod renew_lease;
pub mod submit_application;
pub mod terminate_lease;
pub mod update_application_status;
pub mod update_lease_contract;
pub mod update_property_status;
pub mod update_rent_payment_status;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    cancel_application::CancelApplication, create_lease::CreateLease,
    renew_lease::RenewLease, submit_application::SubmitApplication,
    terminate_lease::TerminateLease,
    update_application_status::UpdateApplicationStatus,
    update_lease_contract::UpdateLeaseContract,
    update_property_status::UpdatePropertyStatus,
    update_rent_payment_status::UpdateRentPaymentStatus,
};
