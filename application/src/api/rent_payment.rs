//! [`RentPayment`]-related definitions.

use common::{Date, DateTime, Money};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{api, Context};

/// A single installment of a `Lease` rent.
#[derive(Clone, Debug, From)]
pub struct RentPayment(domain::RentPayment);

/// A single installment of a `Lease` rent.
#[graphql_object(context = Context)]
impl RentPayment {
    /// Unique identifier of this `RentPayment`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "RentPayment.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `Lease` this `RentPayment` belongs to.
    pub fn lease(&self) -> api::Lease {
        #[expect(unsafe_code, reason = "`RentPayment` references `Lease`")]
        unsafe {
            api::Lease::new_unchecked(self.0.lease_id)
        }
    }

    /// 1-based number of this `RentPayment` in the schedule.
    pub fn installment_number(&self) -> i32 {
        i16::from(self.0.installment_number).into()
    }

    /// `Date` this `RentPayment` is due.
    pub fn due_date(&self) -> Date {
        self.0.due_date
    }

    /// Amount of this `RentPayment`.
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// Status of this `RentPayment`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "RentPayment.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn status(&self) -> Status {
        self.0.status().into()
    }

    /// `DateTime` when this `RentPayment` was paid in full.
    pub fn paid_at(&self) -> Option<DateTime> {
        self.0.paid_at.map(|at| at.coerce())
    }

    /// `DateTime` when this `RentPayment` was created.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `RentPayment` was last modified.
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }
}

/// Unique identifier of a `RentPayment`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::rent_payment::Id)]
#[into(domain::rent_payment::Id)]
#[graphql(name = "RentPaymentId", transparent)]
pub struct Id(Uuid);

/// Status of a `RentPayment`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "RentPaymentStatus")]
pub enum Status {
    /// Awaiting payment.
    Pending,

    /// Paid in full.
    Paid,

    /// Not paid by its due date.
    Overdue,

    /// Paid in part.
    Partial,

    /// Not expected anymore.
    Cancelled,
}

impl From<domain::rent_payment::Status> for Status {
    fn from(status: domain::rent_payment::Status) -> Self {
        use domain::rent_payment::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Paid => Self::Paid,
            S::Overdue => Self::Overdue,
            S::Partial => Self::Partial,
            S::Cancelled => Self::Cancelled,
        }
    }
}

impl From<Status> for domain::rent_payment::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::Paid => Self::Paid,
            Status::Overdue => Self::Overdue,
            Status::Partial => Self::Partial,
            Status::Cancelled => Self::Cancelled,
        }
    }
}
