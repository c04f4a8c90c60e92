//! [`Notification`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, Date, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Application, Lease, User};
use crate::domain::{application, lease, property, user};

/// Lifecycle event addressed to a [`User`], queued in the same transaction as
/// the transition it describes and delivered afterwards.
#[derive(Clone, Debug)]
pub struct Notification {
    /// ID of this [`Notification`].
    pub id: Id,

    /// ID of the [`User`] this [`Notification`] is addressed to.
    pub recipient_id: user::Id,

    /// [`Event`] this [`Notification`] describes.
    pub event: Event,

    /// [`DateTime`] when this [`Notification`] was queued.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Notification`] was delivered, if it was.
    pub delivered_at: Option<DeliveryDateTime>,

    /// [`DateTime`] when delivering this [`Notification`] failed, if it did.
    pub failed_at: Option<FailureDateTime>,

    /// Description of the delivery failure, if any.
    pub failure: Option<String>,
}

impl Notification {
    /// Creates a new undelivered [`Notification`].
    #[must_use]
    pub fn new(recipient_id: user::Id, event: Event) -> Self {
        Self {
            id: Id::new(),
            recipient_id,
            event,
            created_at: common::DateTime::now().coerce(),
            delivered_at: None,
            failed_at: None,
            failure: None,
        }
    }

    /// Indicates whether delivery of this [`Notification`] was attempted.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.delivered_at.is_some() || self.failed_at.is_some()
    }
}

/// ID of a [`Notification`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Lifecycle event.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum Event {
    /// New [`Application`] was submitted.
    #[serde(rename = "application.submitted")]
    ApplicationSubmitted(ApplicationSubmitted),

    /// [`Application`] status changed.
    #[serde(rename = "application.statusUpdated")]
    ApplicationStatusUpdated(ApplicationStatusUpdated),

    /// [`Lease`] was created, updated, renewed or terminated.
    #[serde(rename = "lease.notification")]
    Lease(LeaseNotification),
}

impl Event {
    /// Returns the name of this [`Event`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ApplicationSubmitted(_) => "application.submitted",
            Self::ApplicationStatusUpdated(_) => "application.statusUpdated",
            Self::Lease(_) => "lease.notification",
        }
    }

    /// Returns the name of the [`Property`] this [`Event`] is about.
    ///
    /// [`Property`]: crate::domain::Property
    #[must_use]
    pub fn property_name(&self) -> &property::Name {
        match self {
            Self::ApplicationSubmitted(e) => &e.property_name,
            Self::ApplicationStatusUpdated(e) => &e.property_name,
            Self::Lease(e) => &e.property_name,
        }
    }
}

/// Payload of [`Event::ApplicationSubmitted`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmitted {
    /// ID of the submitted [`Application`].
    pub application_id: application::Id,

    /// ID of the applied [`Property`].
    ///
    /// [`Property`]: crate::domain::Property
    pub property_id: property::Id,

    /// Name of the applied [`Property`].
    ///
    /// [`Property`]: crate::domain::Property
    pub property_name: property::Name,

    /// Offered yearly rent, if any.
    pub offer_amount: Option<Money>,

    /// Requested move-in date, if any.
    pub move_in_date: Option<Date>,
}

/// Payload of [`Event::ApplicationStatusUpdated`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatusUpdated {
    /// ID of the updated [`Application`].
    pub application_id: application::Id,

    /// ID of the applied [`Property`].
    ///
    /// [`Property`]: crate::domain::Property
    pub property_id: property::Id,

    /// Name of the applied [`Property`].
    ///
    /// [`Property`]: crate::domain::Property
    pub property_name: property::Name,

    /// New [`application::Status`].
    pub status: application::Status,

    /// Reason of the rejection or cancellation, if any.
    pub reason: Option<application::Reason>,
}

/// Payload of [`Event::Lease`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseNotification {
    /// [`LeaseAction`] that happened.
    pub action: LeaseAction,

    /// ID of the [`Lease`].
    pub lease_id: lease::Id,

    /// ID of the leased [`Property`].
    ///
    /// [`Property`]: crate::domain::Property
    pub property_id: property::Id,

    /// Name of the leased [`Property`].
    ///
    /// [`Property`]: crate::domain::Property
    pub property_name: property::Name,

    /// First day of the [`Lease`].
    pub start_date: Date,

    /// Last day of the [`Lease`].
    pub end_date: Date,

    /// Rent of the [`Lease`].
    pub rent_amount: Money,

    /// Reason of the termination, if any.
    pub reason: Option<String>,

    /// Number of cheques of a new payment plan, if any.
    pub cheque_count: Option<lease::ChequeCount>,

    /// First due date of a new payment plan, if any.
    pub first_due_date: Option<Date>,
}

impl LeaseNotification {
    /// Creates a new [`LeaseNotification`] about the provided [`Lease`].
    #[must_use]
    pub fn new(
        action: LeaseAction,
        lease: &lease::Lease,
        property_name: property::Name,
    ) -> Self {
        Self {
            action,
            lease_id: lease.id,
            property_id: lease.property_id,
            property_name,
            start_date: lease.start_date,
            end_date: lease.end_date,
            rent_amount: lease.rent_amount,
            reason: None,
            cheque_count: None,
            first_due_date: None,
        }
    }
}

/// Action a [`LeaseNotification`] is about.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseAction {
    /// [`Lease`] was opened.
    #[display("created")]
    Created,

    /// [`Lease`] contract or payment plan changed.
    #[display("updated")]
    Updated,

    /// [`Lease`] was renewed.
    #[display("renewed")]
    Renewed,

    /// [`Lease`] was terminated.
    #[display("terminated")]
    Terminated,
}

/// [`DateTime`] when a [`Notification`] was created.
pub type CreationDateTime = DateTimeOf<(Notification, unit::Creation)>;

/// [`DateTime`] when a [`Notification`] was delivered.
pub type DeliveryDateTime = DateTimeOf<(Notification, unit::Delivery)>;

/// [`DateTime`] when delivering a [`Notification`] failed.
pub type FailureDateTime = DateTimeOf<(Notification, unit::Failure)>;

#[cfg(test)]
mod spec {
    use super::{ApplicationStatusUpdated, Event};
    use crate::domain::{application, property};

    #[test]
    fn serializes_with_event_name() {
        let event = Event::ApplicationStatusUpdated(ApplicationStatusUpdated {
            application_id: application::Id::default(),
            property_id: property::Id::default(),
            property_name: property::Name::new("Villa 7").unwrap(),
            status: application::Status::Rejected,
            reason: Some(application::Reason::lease_awarded_to_another_tenant()),
        });

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], event.name());
        assert_eq!(json["payload"]["propertyName"], "Villa 7");
        assert_eq!(json["payload"]["status"], "rejected");
        assert_eq!(
            json["payload"]["reason"],
            "Lease awarded to another tenant",
        );

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
