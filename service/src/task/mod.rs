//! Background [`Task`]s definitions.

mod background;
pub mod deliver_notifications;
pub mod mark_overdue_rent_payments;

pub use common::Handler as Task;

pub use self::{
    background::Background, deliver_notifications::DeliverNotifications,
    mark_overdue_rent_payments::MarkOverdueRentPayments,
};
