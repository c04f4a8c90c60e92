//! [`Application`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Date, DateTimeOf, Money};
use derive_more::{Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Lease, Property};
use crate::domain::{define_text, property, user};

/// Tenant's request to rent a [`Property`].
///
/// Never deleted: withdrawing or superseding an [`Application`] is expressed
/// with its [`Status`].
#[derive(Clone, Debug)]
pub struct Application {
    /// ID of this [`Application`].
    pub id: Id,

    /// ID of the [`Property`] this [`Application`] is made for.
    pub property_id: property::Id,

    /// ID of the tenant who made this [`Application`].
    pub tenant_id: user::Id,

    /// [`Status`] of this [`Application`].
    pub(crate) status: Status,

    /// [`Applicant`] details provided with this [`Application`].
    pub applicant: Applicant,

    /// Yearly rent offered by the tenant, if any.
    pub offer_amount: Option<Money>,

    /// [`Date`] the tenant wants to move in, if any.
    pub move_in_date: Option<Date>,

    /// [`Reason`] of rejecting or cancelling this [`Application`], if any.
    pub rejection_reason: Option<Reason>,

    /// ID of the [`user::User`] who reviewed this [`Application`] last.
    pub reviewed_by: Option<user::Id>,

    /// [`DateTime`] when this [`Application`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Application`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Application {
    /// Creates a new [`Status::Pending`] [`Application`].
    #[must_use]
    pub fn new(
        property_id: property::Id,
        tenant_id: user::Id,
        applicant: Applicant,
        offer_amount: Option<Money>,
        move_in_date: Option<Date>,
    ) -> Self {
        let now = common::DateTime::now();
        Self {
            id: Id::new(),
            property_id,
            tenant_id,
            status: Status::Pending,
            applicant,
            offer_amount,
            move_in_date,
            rejection_reason: None,
            reviewed_by: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    /// Returns [`Status`] of this [`Application`].
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Indicates whether this [`Application`] still awaits a decision.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Moves this [`Application`] into the provided [`Status`].
    ///
    /// # Errors
    ///
    /// If the transition is not allowed for the provided [`Trigger`].
    pub fn transition(
        &mut self,
        to: Status,
        trigger: Trigger,
        at: ModificationDateTime,
    ) -> Result<(), TransitionError> {
        if !self.status.allows(to, trigger) {
            return Err(TransitionError {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = at;
        Ok(())
    }

    /// Reviews this [`Application`], moving it into the provided [`Status`].
    ///
    /// # Errors
    ///
    /// If the transition is not allowed for a review.
    pub fn review(
        &mut self,
        to: Status,
        reviewer: user::Id,
        reason: Option<Reason>,
        at: ModificationDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(to, Trigger::Review, at)?;
        self.reviewed_by = Some(reviewer);
        if matches!(to, Status::Rejected) || reason.is_some() {
            self.rejection_reason = reason;
        }
        Ok(())
    }

    /// Rejects this [`Application`] because a [`Lease`] was awarded to
    /// another tenant.
    ///
    /// # Errors
    ///
    /// If this [`Application`] is not active anymore.
    pub fn reject_as_outbid(
        &mut self,
        reviewer: user::Id,
        at: ModificationDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(Status::Rejected, Trigger::System, at)?;
        self.reviewed_by = Some(reviewer);
        self.rejection_reason = Some(Reason::lease_awarded_to_another_tenant());
        Ok(())
    }

    /// Cancels this [`Application`] on the system's behalf, recording the
    /// provided [`Reason`].
    ///
    /// # Errors
    ///
    /// If this [`Application`] is not in [`Status::Approved`].
    pub fn supersede(
        &mut self,
        reason: Reason,
        at: ModificationDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(Status::Cancelled, Trigger::System, at)?;
        self.rejection_reason = Some(reason);
        Ok(())
    }

    /// Withdraws this [`Application`] on behalf of its tenant or an admin.
    ///
    /// # Errors
    ///
    /// If this [`Application`] is [`Status::Approved`].
    pub fn withdraw(
        &mut self,
        at: ModificationDateTime,
    ) -> Result<(), TransitionError> {
        self.transition(Status::Cancelled, Trigger::Withdrawal, at)
    }
}

/// ID of an [`Application`].
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

define_kind! {
    #[doc = "Status of an [`Application`]."]
    enum Status {
        #[doc = "Submitted and awaiting review."]
        Pending = 1,

        #[doc = "Being reviewed by the owner."]
        UnderReview = 2,

        #[doc = "Approved, a [`Lease`] is opened for it."]
        Approved = 3,

        #[doc = "Rejected by a reviewer or by another approval."]
        Rejected = 4,

        #[doc = "Withdrawn or superseded."]
        Cancelled = 5,
    }
}

impl Status {
    /// Indicates whether an [`Application`] in this [`Status`] still awaits a
    /// decision.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::UnderReview)
    }

    /// Indicates whether the transition from this [`Status`] into the `to`
    /// one is allowed for the provided [`Trigger`].
    #[must_use]
    pub const fn allows(self, to: Self, trigger: Trigger) -> bool {
        use Status as S;
        use Trigger as T;

        match (trigger, self, to) {
            (
                T::Review,
                S::Pending,
                S::UnderReview | S::Approved | S::Rejected,
            )
            | (T::Review, S::UnderReview, S::Pending | S::Approved | S::Rejected)
            | (
                T::Withdrawal,
                S::Pending | S::UnderReview | S::Rejected | S::Cancelled,
                S::Cancelled,
            )
            | (T::System, S::Approved, S::Cancelled)
            | (T::System, S::Pending | S::UnderReview, S::Rejected) => true,
            (T::Review | T::Withdrawal | T::System, _, _) => false,
        }
    }
}

/// Origin of an [`Application`] [`Status`] transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Trigger {
    /// Decision of an owner or an admin.
    Review,

    /// Withdrawal by the tenant or an admin.
    Withdrawal,

    /// Side effect of another transition.
    System,
}

/// Details an applicant provides along with an [`Application`].
#[derive(Clone, Debug)]
pub struct Applicant {
    /// Full name of the applicant.
    pub full_name: user::Name,

    /// Contact [`user::Email`] of the applicant, if any.
    pub email: Option<user::Email>,

    /// Contact [`user::Phone`] of the applicant, if any.
    pub phone: Option<user::Phone>,

    /// National ID (Emirates ID) of the applicant.
    pub national_id: DocumentNumber,

    /// Passport number of the applicant.
    pub passport_number: DocumentNumber,

    /// Free-form [`Message`] to the owner, if any.
    pub message: Option<Message>,
}

define_text! {
    #[doc = "Number of an identity document."]
    DocumentNumber(max = 64)
}

define_text! {
    #[doc = "Message of an applicant to the owner."]
    Message(max = 4096)
}

define_text! {
    #[doc = "Reason of rejecting or cancelling an [`Application`]."]
    Reason(max = 1024)
}

impl Reason {
    /// [`Reason`] of a sibling rejection on approval.
    pub const LEASE_AWARDED_TO_ANOTHER_TENANT: &'static str =
        "Lease awarded to another tenant";

    /// [`Reason`] of cancelling an approved [`Application`] on re-application.
    pub const SUPERSEDED_BY_NEW_APPLICATION: &'static str =
        "Superseded by new application";

    /// [`Reason`] of rejecting an [`Application`] because a [`Lease`] was
    /// awarded to another tenant.
    #[must_use]
    pub fn lease_awarded_to_another_tenant() -> Self {
        Self(Self::LEASE_AWARDED_TO_ANOTHER_TENANT.into())
    }

    /// [`Reason`] of cancelling an approved [`Application`] when its tenant
    /// applies for the same [`Property`] again.
    #[must_use]
    pub fn superseded_by_new_application() -> Self {
        Self(Self::SUPERSEDED_BY_NEW_APPLICATION.into())
    }

    /// [`Reason`] of cancelling an approved [`Application`] when its
    /// [`Lease`] is ended by setting the [`Property`] status.
    #[must_use]
    pub fn lease_ended(status: property::Status) -> Self {
        Self(format!(
            "Lease ended and property set to {}",
            status.to_string().replace('_', " "),
        ))
    }
}

/// Error of a disallowed [`Application`] [`Status`] transition.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Application(id: {id})` cannot move from `{from}` to `{to}`")]
pub struct TransitionError {
    /// ID of the [`Application`].
    pub id: Id,

    /// Current [`Status`] of the [`Application`].
    pub from: Status,

    /// Requested [`Status`] of the [`Application`].
    pub to: Status,
}

/// [`DateTime`] when an [`Application`] was created.
pub type CreationDateTime = DateTimeOf<(Application, unit::Creation)>;

/// [`DateTime`] when an [`Application`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Application, unit::Modification)>;
