//! [`Application`]-related definitions.

use common::{Date, DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A tenant's application to rent a property.
#[derive(Clone, Debug, From)]
pub struct Application(domain::Application);

impl Application {
    /// Indicates whether identity documents of this [`Application`] are
    /// visible to the current [`User`].
    ///
    /// [`User`]: api::User
    async fn is_visible_in_full(&self, ctx: &Context) -> Result<bool, Error> {
        let Some(initiator) = ctx.try_initiator().await? else {
            return Ok(false);
        };
        if initiator.id == self.0.tenant_id {
            return Ok(true);
        }
        Ok(ctx
            .service()
            .execute(query::property::ById::by(self.0.property_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .is_some_and(|p| p.is_managed_by(initiator)))
    }
}

/// A tenant's application to rent a property.
#[graphql_object(context = Context)]
impl Application {
    /// Unique identifier of this `Application`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `Property` this `Application` is made for.
    pub fn property(&self) -> api::Property {
        #[expect(unsafe_code, reason = "`Application` references `Property`")]
        unsafe {
            api::Property::new_unchecked(self.0.property_id)
        }
    }

    /// Tenant who made this `Application`.
    pub fn tenant(&self) -> api::User {
        #[expect(unsafe_code, reason = "`Application` references tenant")]
        unsafe {
            api::User::new_unchecked(self.0.tenant_id)
        }
    }

    /// Status of this `Application`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn status(&self) -> Status {
        self.0.status().into()
    }

    /// Full name of the applicant.
    pub fn full_name(&self) -> api::user::Name {
        self.0.applicant.full_name.clone().into()
    }

    /// Contact email of the applicant.
    pub fn email(&self) -> Option<api::user::Email> {
        self.0.applicant.email.clone().map(Into::into)
    }

    /// Contact phone of the applicant.
    pub fn phone(&self) -> Option<api::user::Phone> {
        self.0.applicant.phone.clone().map(Into::into)
    }

    /// National ID of the applicant.
    ///
    /// Visible to the applicant, the `Property` owner and admins only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.nationalId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn national_id(
        &self,
        ctx: &Context,
    ) -> Result<Option<DocumentNumber>, Error> {
        Ok(self
            .is_visible_in_full(ctx)
            .await?
            .then(|| self.0.applicant.national_id.clone().into()))
    }

    /// Passport number of the applicant.
    ///
    /// Visible to the applicant, the `Property` owner and admins only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.passportNumber",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn passport_number(
        &self,
        ctx: &Context,
    ) -> Result<Option<DocumentNumber>, Error> {
        Ok(self
            .is_visible_in_full(ctx)
            .await?
            .then(|| self.0.applicant.passport_number.clone().into()))
    }

    /// Message of the applicant to the owner.
    pub fn message(&self) -> Option<Message> {
        self.0.applicant.message.clone().map(Into::into)
    }

    /// Yearly rent offered by the applicant.
    pub fn offer_amount(&self) -> Option<Money> {
        self.0.offer_amount
    }

    /// `Date` the applicant wants to move in.
    pub fn move_in_date(&self) -> Option<Date> {
        self.0.move_in_date
    }

    /// Reason of rejecting or cancelling this `Application`.
    pub fn rejection_reason(&self) -> Option<Reason> {
        self.0.rejection_reason.clone().map(Into::into)
    }

    /// `User` who reviewed this `Application` last.
    pub fn reviewed_by(&self) -> Option<api::User> {
        self.0.reviewed_by.map(|id| {
            #[expect(unsafe_code, reason = "`Application` references reviewer")]
            unsafe {
                api::User::new_unchecked(id)
            }
        })
    }

    /// Latest `Lease` of this `Application`, if any.
    ///
    /// Renewals belong to the same `Application`, so this is the last `Lease`
    /// of the renewal chain.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Application.lease",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn lease(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Lease>, Error> {
        ctx.service()
            .execute(query::lease::OfApplication::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|l| l.map(Into::into))
    }

    /// `DateTime` when this `Application` was created.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Application` was last modified.
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }
}

/// Unique identifier of an `Application`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::application::Id)]
#[into(domain::application::Id)]
#[graphql(name = "ApplicationId", transparent)]
pub struct Id(Uuid);

/// Number of an identity document.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "DocumentNumber",
    with = scalar::Via::<domain::application::DocumentNumber>,
)]
pub struct DocumentNumber(domain::application::DocumentNumber);

/// Message of an applicant to the owner.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ApplicationMessage",
    with = scalar::Via::<domain::application::Message>,
)]
pub struct Message(domain::application::Message);

/// Reason of rejecting or cancelling an `Application`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ApplicationReason",
    with = scalar::Via::<domain::application::Reason>,
)]
pub struct Reason(domain::application::Reason);

/// Status of an `Application`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "ApplicationStatus")]
pub enum Status {
    /// Submitted and awaiting review.
    Pending,

    /// Being reviewed by the owner.
    UnderReview,

    /// Approved, a `Lease` is opened for it.
    Approved,

    /// Rejected by a reviewer or by another approval.
    Rejected,

    /// Withdrawn or superseded.
    Cancelled,
}

impl From<domain::application::Status> for Status {
    fn from(status: domain::application::Status) -> Self {
        use domain::application::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::UnderReview => Self::UnderReview,
            S::Approved => Self::Approved,
            S::Rejected => Self::Rejected,
            S::Cancelled => Self::Cancelled,
        }
    }
}

impl From<Status> for domain::application::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::UnderReview => Self::UnderReview,
            Status::Approved => Self::Approved,
            Status::Rejected => Self::Rejected,
            Status::Cancelled => Self::Cancelled,
        }
    }
}
