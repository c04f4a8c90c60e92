//! [`RentPayment`] definitions.

pub mod schedule;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Date, DateTimeOf, Money};
use derive_more::{Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Lease;
use crate::domain::lease;

pub use self::schedule::{schedule, Schedule};

/// Single scheduled installment of a [`Lease`] rent.
#[derive(Clone, Debug)]
pub struct RentPayment {
    /// ID of this [`RentPayment`].
    pub id: Id,

    /// ID of the [`Lease`] this [`RentPayment`] belongs to.
    pub lease_id: lease::Id,

    /// 1-based position of this [`RentPayment`] in its schedule.
    pub installment_number: InstallmentNumber,

    /// [`Date`] this [`RentPayment`] is due at.
    pub due_date: Date,

    /// Amount of this [`RentPayment`].
    pub amount: Money,

    /// [`Status`] of this [`RentPayment`].
    pub(crate) status: Status,

    /// [`DateTime`] when this [`RentPayment`] was paid in full, if it was.
    pub paid_at: Option<PaymentDateTime>,

    /// [`DateTime`] when this [`RentPayment`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`RentPayment`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl RentPayment {
    /// Returns [`Status`] of this [`RentPayment`].
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Indicates whether this [`RentPayment`] still expects money.
    #[must_use]
    pub const fn is_outstanding(&self) -> bool {
        self.status.is_outstanding()
    }

    /// Moves this [`RentPayment`] into the provided [`Status`] on behalf of an
    /// owner or an admin.
    ///
    /// # Errors
    ///
    /// If the transition is not allowed.
    pub fn set_status(
        &mut self,
        to: Status,
        at: ModificationDateTime,
    ) -> Result<(), TransitionError> {
        if !self.status.allows(to) {
            return Err(TransitionError {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        if matches!(to, Status::Paid) {
            self.paid_at = Some(at.coerce());
        }
        self.updated_at = at;
        Ok(())
    }

    /// Cancels this [`RentPayment`] if it's still outstanding.
    ///
    /// Returns whether this [`RentPayment`] was cancelled.
    pub fn cancel(&mut self, at: ModificationDateTime) -> bool {
        if !self.is_outstanding() {
            return false;
        }
        self.status = Status::Cancelled;
        self.updated_at = at;
        true
    }

    /// Marks this [`RentPayment`] as [`Status::Overdue`] if it's due before
    /// the provided `today` and not settled yet.
    ///
    /// Returns whether this [`RentPayment`] was marked.
    pub fn mark_overdue(&mut self, today: Date, at: ModificationDateTime) -> bool {
        if !matches!(self.status, Status::Pending | Status::Partial)
            || self.due_date >= today
        {
            return false;
        }
        self.status = Status::Overdue;
        self.updated_at = at;
        true
    }
}

/// ID of a [`RentPayment`].
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

/// 1-based number of a [`RentPayment`] in its schedule.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct InstallmentNumber(i16);

define_kind! {
    #[doc = "Status of a [`RentPayment`]."]
    enum Status {
        #[doc = "Awaiting payment."]
        Pending = 1,

        #[doc = "Paid in full."]
        Paid = 2,

        #[doc = "Not paid by its due date."]
        Overdue = 3,

        #[doc = "Paid in part."]
        Partial = 4,

        #[doc = "Not expected anymore."]
        Cancelled = 5,
    }
}

impl Status {
    /// Indicates whether a [`RentPayment`] in this [`Status`] still expects
    /// money.
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Pending | Self::Overdue | Self::Partial)
    }

    /// Indicates whether an owner or an admin may move a [`RentPayment`] from
    /// this [`Status`] into the `to` one.
    #[must_use]
    pub const fn allows(self, to: Self) -> bool {
        use Status as S;

        matches!(
            (self, to),
            (S::Pending, S::Paid | S::Partial | S::Overdue)
                | (S::Overdue, S::Paid | S::Partial)
                | (S::Partial, S::Paid | S::Overdue),
        )
    }
}

/// Error of a disallowed [`RentPayment`] [`Status`] transition.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`RentPayment(id: {id})` cannot move from `{from}` to `{to}`")]
pub struct TransitionError {
    /// ID of the [`RentPayment`].
    pub id: Id,

    /// Current [`Status`] of the [`RentPayment`].
    pub from: Status,

    /// Requested [`Status`] of the [`RentPayment`].
    pub to: Status,
}

/// [`DateTime`] when a [`RentPayment`] was created.
pub type CreationDateTime = DateTimeOf<(RentPayment, unit::Creation)>;

/// [`DateTime`] when a [`RentPayment`] was last modified.
pub type ModificationDateTime = DateTimeOf<(RentPayment, unit::Modification)>;

/// [`DateTime`] when a [`RentPayment`] was paid.
pub type PaymentDateTime = DateTimeOf<(RentPayment, unit::Payment)>;

#[cfg(test)]
mod spec {
    use common::{Date, DateTime};
    use strum::IntoEnumIterator as _;

    use super::{Id, RentPayment, Status};
    use crate::domain::lease;

    fn payment(status: Status, due: &str) -> RentPayment {
        let now = DateTime::now();
        RentPayment {
            id: Id::new(),
            lease_id: lease::Id::new(),
            installment_number: 1.into(),
            due_date: due.parse().unwrap(),
            amount: "2500".parse().unwrap(),
            status,
            paid_at: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    #[test]
    fn manual_transitions() {
        use Status as S;

        let allowed = [
            (S::Pending, S::Paid),
            (S::Pending, S::Partial),
            (S::Pending, S::Overdue),
            (S::Overdue, S::Paid),
            (S::Overdue, S::Partial),
            (S::Partial, S::Paid),
            (S::Partial, S::Overdue),
        ];
        for from in S::iter() {
            for to in S::iter() {
                assert_eq!(
                    from.allows(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}",
                );
            }
        }
    }

    #[test]
    fn records_payment_time() {
        let mut p = payment(Status::Pending, "2025-01-01");

        p.set_status(Status::Paid, DateTime::now().coerce()).unwrap();

        assert_eq!(p.status(), Status::Paid);
        assert!(p.paid_at.is_some());
        assert!(p.set_status(Status::Overdue, DateTime::now().coerce()).is_err());
    }

    #[test]
    fn cancels_outstanding_only() {
        for status in Status::iter() {
            let mut p = payment(status, "2025-01-01");

            let cancelled = p.cancel(DateTime::now().coerce());

            assert_eq!(cancelled, status.is_outstanding(), "{status}");
            if cancelled {
                assert_eq!(p.status(), Status::Cancelled);
            } else {
                assert_eq!(p.status(), status);
            }
        }
    }

    #[test]
    fn marks_overdue_after_due_date() {
        let today: Date = "2025-02-01".parse().unwrap();

        let mut due_yesterday = payment(Status::Pending, "2025-01-31");
        assert!(due_yesterday.mark_overdue(today, DateTime::now().coerce()));
        assert_eq!(due_yesterday.status(), Status::Overdue);

        let mut due_today = payment(Status::Partial, "2025-02-01");
        assert!(!due_today.mark_overdue(today, DateTime::now().coerce()));

        let mut paid = payment(Status::Paid, "2025-01-01");
        assert!(!paid.mark_overdue(today, DateTime::now().coerce()));
    }
}
