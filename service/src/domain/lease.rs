//! [`Lease`] definitions.

use std::num::NonZeroU8;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Date, DateTimeOf, Money};
use derive_more::{Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Application, RentPayment};
use crate::domain::{application, define_text, property, user, Property};

/// Tenancy of a [`Property`] by a tenant for a date range at a fixed rent.
///
/// [`Status::Terminated`] and [`Status::Renewed`] [`Lease`]s are immutable
/// history.
#[derive(Clone, Debug)]
pub struct Lease {
    /// ID of this [`Lease`].
    pub id: Id,

    /// ID of the [`Application`] this [`Lease`] was opened for, if any.
    pub application_id: Option<application::Id>,

    /// ID of the [`Lease`] this one is a renewal of, if any.
    pub previous_lease_id: Option<Id>,

    /// ID of the leased [`Property`].
    pub property_id: property::Id,

    /// ID of the tenant.
    pub tenant_id: user::Id,

    /// ID of the [`Property`] owner.
    pub owner_id: user::Id,

    /// First day of this [`Lease`].
    pub start_date: Date,

    /// Last day of this [`Lease`].
    pub end_date: Date,

    /// Rent for the whole period of this [`Lease`].
    pub rent_amount: Money,

    /// Security deposit held for this [`Lease`].
    pub security_deposit: Money,

    /// [`Status`] of this [`Lease`].
    pub(crate) status: Status,

    /// Ejari registration number of this [`Lease`], if registered.
    pub ejari_number: Option<EjariNumber>,

    /// Ejari registration status of this [`Lease`], if registered.
    pub ejari_status: Option<EjariStatus>,

    /// Signed [`ContractDocument`] of this [`Lease`], if uploaded.
    pub contract: Option<ContractDocument>,

    /// Number of cheques the rent is paid with, once chosen.
    pub cheque_count: Option<ChequeCount>,

    /// [`PaymentMethod`] of the rent, once chosen.
    pub payment_method: Option<PaymentMethod>,

    /// Summary of the current [`RentPayment`] schedule, if generated.
    pub payment_plan: Option<PaymentPlan>,

    /// [`Termination`] details, if this [`Lease`] was terminated.
    pub termination: Option<Termination>,

    /// [`DateTime`] when this [`Lease`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Lease`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Lease {
    /// Opens a new [`Status::Active`] [`Lease`] of the provided [`Property`].
    ///
    /// # Errors
    ///
    /// If `end_date` is not after `start_date`.
    pub fn open(
        property: &Property,
        tenant_id: user::Id,
        application_id: Option<application::Id>,
        (start_date, end_date): (Date, Date),
        rent_amount: Money,
        security_deposit: Money,
    ) -> Result<Self, InvalidPeriod> {
        if end_date <= start_date {
            return Err(InvalidPeriod {
                start: start_date,
                end: end_date,
            });
        }

        let now = common::DateTime::now();
        Ok(Self {
            id: Id::new(),
            application_id,
            previous_lease_id: None,
            property_id: property.id,
            tenant_id,
            owner_id: property.owner_id,
            start_date,
            end_date,
            rent_amount,
            security_deposit,
            status: Status::Active,
            ejari_number: None,
            ejari_status: None,
            contract: None,
            cheque_count: None,
            payment_method: None,
            payment_plan: None,
            termination: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        })
    }

    /// Returns [`Status`] of this [`Lease`].
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Indicates whether this [`Lease`] is [`Status::Active`].
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, Status::Active)
    }

    /// Indicates whether the provided [`user::Initiator`] manages this
    /// [`Lease`], being the [`Property`] owner or an admin.
    #[must_use]
    pub fn is_managed_by(&self, initiator: user::Initiator) -> bool {
        match initiator.role {
            user::Role::Admin => true,
            user::Role::Owner => initiator.id == self.owner_id,
            user::Role::Tenant => false,
        }
    }

    /// Terminates this [`Lease`].
    ///
    /// # Errors
    ///
    /// If this [`Lease`] is not [`Status::Active`].
    pub fn terminate(
        &mut self,
        reason: Option<Reason>,
        move_out_inspection: Option<Inspection>,
        at: ModificationDateTime,
    ) -> Result<(), NotActive> {
        if !self.is_active() {
            return Err(NotActive {
                id: self.id,
                status: self.status,
            });
        }
        self.status = Status::Terminated;
        self.termination = Some(Termination {
            reason,
            move_out_inspection,
            terminated_at: at.coerce(),
        });
        self.updated_at = at;
        Ok(())
    }

    /// Renews this [`Lease`], returning its [`Status::Active`] successor
    /// starting at the end of this one.
    ///
    /// The successor inherits the Ejari registration and the security
    /// deposit, while the rent is kept unless `new_rent_amount` is provided.
    ///
    /// # Errors
    ///
    /// If this [`Lease`] is not [`Status::Active`], or the `new_end_date` is
    /// not after its current end.
    pub fn renew(
        &mut self,
        new_end_date: Date,
        new_rent_amount: Option<Money>,
        at: ModificationDateTime,
    ) -> Result<Self, RenewalError> {
        if !self.is_active() {
            return Err(NotActive {
                id: self.id,
                status: self.status,
            }
            .into());
        }
        if new_end_date <= self.end_date {
            return Err(InvalidPeriod {
                start: self.end_date,
                end: new_end_date,
            }
            .into());
        }

        self.status = Status::Renewed;
        self.updated_at = at;

        Ok(Self {
            id: Id::new(),
            application_id: self.application_id,
            previous_lease_id: Some(self.id),
            property_id: self.property_id,
            tenant_id: self.tenant_id,
            owner_id: self.owner_id,
            start_date: self.end_date,
            end_date: new_end_date,
            rent_amount: new_rent_amount.unwrap_or(self.rent_amount),
            security_deposit: self.security_deposit,
            status: Status::Active,
            ejari_number: self.ejari_number.clone(),
            ejari_status: self.ejari_status.clone(),
            contract: None,
            cheque_count: None,
            payment_method: None,
            payment_plan: None,
            termination: None,
            created_at: at.coerce(),
            updated_at: at,
        })
    }
}

/// ID of a [`Lease`].
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
    #[doc = "Status of a [`Lease`]."]
    enum Status {
        #[doc = "Currently in force."]
        Active = 1,

        #[doc = "Ended before or at its end date."]
        Terminated = 2,

        #[doc = "Replaced by a successor [`Lease`]."]
        Renewed = 3,
    }
}

define_kind! {
    #[doc = "Method of paying the rent of a [`Lease`]."]
    enum PaymentMethod {
        #[doc = "Post-dated cheques."]
        Cheque = 1,

        #[doc = "Bank transfer."]
        BankTransfer = 2,

        #[doc = "Cash."]
        Cash = 3,

        #[doc = "Credit card."]
        CreditCard = 4,
    }
}

/// Number of cheques the rent of a [`Lease`] is split into.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct ChequeCount(u8);

impl ChequeCount {
    /// Allowed numbers of cheques, dividing a year evenly into months.
    pub const ALLOWED: [u8; 5] = [1, 2, 4, 6, 12];

    /// Creates a new [`ChequeCount`] if the provided `count` is one of the
    /// [`ChequeCount::ALLOWED`] ones.
    #[must_use]
    pub fn new(count: u8) -> Option<Self> {
        Self::ALLOWED.contains(&count).then_some(Self(count))
    }

    /// Returns the number of cheques.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the number of cheques as a divisor of the rent.
    #[must_use]
    pub const fn divisor(self) -> NonZeroU8 {
        match NonZeroU8::new(self.0) {
            Some(n) => n,
            None => NonZeroU8::MIN,
        }
    }

    /// Returns the number of months between two consecutive due dates.
    #[must_use]
    pub const fn interval_months(self) -> u8 {
        12 / self.0
    }
}

impl TryFrom<u8> for ChequeCount {
    type Error = UnsupportedChequeCount;

    fn try_from(count: u8) -> Result<Self, Self::Error> {
        Self::new(count).ok_or(UnsupportedChequeCount(count))
    }
}

/// Error of an unsupported [`ChequeCount`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display(
    "`{_0}` is not an allowed cheque count, expected one of 1, 2, 4, 6, 12"
)]
pub struct UnsupportedChequeCount(#[error(not(source))] pub u8);

/// Summary of a [`RentPayment`] schedule stored along with a [`Lease`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PaymentPlan {
    /// Number of installments.
    pub cheque_count: ChequeCount,

    /// Number of months between two consecutive installments.
    pub interval_months: u8,

    /// [`PaymentMethod`] of the installments, if chosen.
    pub payment_method: Option<PaymentMethod>,

    /// Due date of the first installment.
    pub first_due_date: Date,

    /// Amount of every installment but the last one.
    pub installment_amount: Money,

    /// Amount of the last installment, absorbing the rounding remainder.
    pub last_installment_amount: Money,

    /// Total amount of all installments.
    pub total: Money,
}

/// Signed contract document of a [`Lease`].
#[derive(Clone, Debug)]
pub struct ContractDocument {
    /// [`DocumentUrl`] of the uploaded document.
    pub url: DocumentUrl,

    /// ID of the [`user::User`] who uploaded the document.
    pub uploaded_by: user::Id,

    /// [`DateTime`] when the document was uploaded.
    pub uploaded_at: UploadDateTime,
}

/// Details of a [`Lease`] termination.
#[derive(Clone, Debug)]
pub struct Termination {
    /// [`Reason`] of the termination, if provided.
    pub reason: Option<Reason>,

    /// Notes of the move-out [`Inspection`], if any.
    pub move_out_inspection: Option<Inspection>,

    /// [`DateTime`] when the [`Lease`] was terminated.
    pub terminated_at: TerminationDateTime,
}

define_text! {
    #[doc = "Ejari registration number of a [`Lease`]."]
    EjariNumber(max = 64)
}

define_text! {
    #[doc = "Ejari registration status of a [`Lease`]."]
    EjariStatus(max = 64)
}

define_text! {
    #[doc = "URL of a [`ContractDocument`]."]
    DocumentUrl(max = 2048)
}

define_text! {
    #[doc = "Reason of a [`Lease`] termination."]
    Reason(max = 1024)
}

define_text! {
    #[doc = "Notes of a move-out inspection."]
    Inspection(max = 4096)
}

/// Error of a [`Lease`] not being [`Status::Active`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Lease(id: {id})` is `{status}`, not active")]
pub struct NotActive {
    /// ID of the [`Lease`].
    pub id: Id,

    /// Actual [`Status`] of the [`Lease`].
    pub status: Status,
}

/// Error of a [`Lease`] period not ending after its start.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Lease` must end after `{start}`, but ends at `{end}`")]
pub struct InvalidPeriod {
    /// Start of the period.
    pub start: Date,

    /// End of the period.
    pub end: Date,
}

/// Error of renewing a [`Lease`].
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum RenewalError {
    /// [`Lease`] is not active.
    NotActive(NotActive),

    /// New end date is not after the current one.
    InvalidPeriod(InvalidPeriod),
}

/// [`DateTime`] when a [`Lease`] was created.
pub type CreationDateTime = DateTimeOf<(Lease, unit::Creation)>;

/// [`DateTime`] when a [`Lease`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Lease, unit::Modification)>;

/// [`DateTime`] when a [`ContractDocument`] was uploaded.
pub type UploadDateTime = DateTimeOf<(Lease, unit::Upload)>;

/// [`DateTime`] when a [`Lease`] was terminated.
pub type TerminationDateTime = DateTimeOf<(Lease, unit::Termination)>;

#[cfg(test)]
mod spec {
    use common::{Date, DateTime, Money};

    use super::{
        ChequeCount, EjariNumber, Lease, PaymentMethod, RenewalError, Status,
    };
    use crate::domain::{property, user, Property};

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn lease() -> Lease {
        let property = Property::new(
            user::Id::new(),
            property::Name::new("JLT Cluster D 402").unwrap(),
            money("85000"),
        );
        Lease::open(
            &property,
            user::Id::new(),
            None,
            (date("2025-01-01"), date("2026-01-01")),
            money("85000"),
            money("85000"),
        )
        .unwrap()
    }

    #[test]
    fn cheque_counts() {
        for (count, interval) in [(1, 12), (2, 6), (4, 3), (6, 2), (12, 1)] {
            let c = ChequeCount::new(count).unwrap();
            assert_eq!(c.interval_months(), interval);
        }
        for count in [0, 3, 5, 7, 24] {
            assert!(ChequeCount::new(count).is_none(), "{count}");
        }
    }

    #[test]
    fn refuses_empty_period() {
        let property = Property::new(
            user::Id::new(),
            property::Name::new("Unit").unwrap(),
            money("1000"),
        );

        let res = Lease::open(
            &property,
            user::Id::new(),
            None,
            (date("2025-01-01"), date("2025-01-01")),
            money("1000"),
            money("1000"),
        );

        assert!(res.is_err());
    }

    #[test]
    fn terminates_once() {
        let mut l = lease();

        l.terminate(None, None, DateTime::now().coerce()).unwrap();
        assert_eq!(l.status(), Status::Terminated);
        assert!(l.termination.is_some());

        assert!(l.terminate(None, None, DateTime::now().coerce()).is_err());
    }

    #[test]
    fn renews_into_successor() {
        let mut l = lease();
        l.ejari_number = EjariNumber::new("EJ-2025-0001");

        let next = l
            .renew(date("2027-01-01"), Some(money("90000")), DateTime::now().coerce())
            .unwrap();

        assert_eq!(l.status(), Status::Renewed);
        assert_eq!(next.status(), Status::Active);
        assert_eq!(next.previous_lease_id, Some(l.id));
        assert_eq!(next.start_date, l.end_date);
        assert_eq!(next.end_date, date("2027-01-01"));
        assert_eq!(next.rent_amount, money("90000"));
        assert_eq!(next.security_deposit, l.security_deposit);
        assert_eq!(next.ejari_number, l.ejari_number);
        assert_eq!(next.property_id, l.property_id);
    }

    #[test]
    fn refuses_renewal_not_extending() {
        let mut l = lease();

        let err = l
            .renew(date("2025-06-01"), None, DateTime::now().coerce())
            .unwrap_err();

        assert!(matches!(err, RenewalError::InvalidPeriod(_)));
        assert_eq!(l.status(), Status::Active);
    }

    #[test]
    fn serializes_payment_method_as_snake_case() {
        let json = serde_json::to_value(PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, serde_json::json!("bank_transfer"));

        let back: PaymentMethod = serde_json::from_value(json).unwrap();
        assert_eq!(back, PaymentMethod::BankTransfer);
    }
}
