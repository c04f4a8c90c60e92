//! [`Lease`]-related definitions.

use common::{Date, DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::{future, TryFutureExt as _};
use juniper::{graphql_object, GraphQLEnum, GraphQLObject, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A tenancy agreement between a tenant and a property owner.
#[derive(Clone, Debug)]
pub struct Lease {
    /// ID of this [`Lease`].
    id: Id,

    /// Underlying [`domain::Lease`].
    lease: OnceCell<domain::Lease>,
}

impl From<domain::Lease> for Lease {
    fn from(lease: domain::Lease) -> Self {
        Self {
            id: lease.id.into(),
            lease: OnceCell::new_with(Some(lease)),
        }
    }
}

impl Lease {
    /// Creates a new [`Lease`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Lease`] with the provided ID exists,
    /// otherwise accessing this [`Lease`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            lease: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Lease`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Lease`] doesn't exist.
    async fn lease(&self, ctx: &Context) -> Result<&domain::Lease, Error> {
        let id = self.id.into();
        self.lease
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::lease::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|l| {
                        future::ready(l.ok_or_else(|| {
                            api::query::LeaseError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A tenancy agreement between a tenant and a property owner.
#[graphql_object(context = Context)]
impl Lease {
    /// Unique identifier of this `Lease`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lease.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Status of this `Lease`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lease.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.lease(ctx).await?.status().into())
    }

    /// ID of the `Application` this `Lease` was opened for.
    ///
    /// `null` for renewals.
    pub async fn application_id(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::application::Id>, Error> {
        Ok(self.lease(ctx).await?.application_id.map(Into::into))
    }

    /// `Lease` this one renews.
    pub async fn previous_lease(
        &self,
        ctx: &Context,
    ) -> Result<Option<Self>, Error> {
        Ok(self.lease(ctx).await?.previous_lease_id.map(|id| {
            #[expect(unsafe_code, reason = "`Lease` references predecessor")]
            unsafe {
                Self::new_unchecked(id)
            }
        }))
    }

    /// Leased `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lease.property",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn property(
        &self,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let property_id = self.lease(ctx).await?.property_id;
        #[expect(unsafe_code, reason = "`Lease` references `Property`")]
        Ok(unsafe { api::Property::new_unchecked(property_id) })
    }

    /// Tenant of this `Lease`.
    pub async fn tenant(&self, ctx: &Context) -> Result<api::User, Error> {
        let tenant_id = self.lease(ctx).await?.tenant_id;
        #[expect(unsafe_code, reason = "`Lease` references tenant")]
        Ok(unsafe { api::User::new_unchecked(tenant_id) })
    }

    /// Owner of the leased `Property`.
    pub async fn owner(&self, ctx: &Context) -> Result<api::User, Error> {
        let owner_id = self.lease(ctx).await?.owner_id;
        #[expect(unsafe_code, reason = "`Lease` references owner")]
        Ok(unsafe { api::User::new_unchecked(owner_id) })
    }

    /// First day of this `Lease`.
    pub async fn start_date(&self, ctx: &Context) -> Result<Date, Error> {
        Ok(self.lease(ctx).await?.start_date)
    }

    /// Last day of this `Lease`.
    pub async fn end_date(&self, ctx: &Context) -> Result<Date, Error> {
        Ok(self.lease(ctx).await?.end_date)
    }

    /// Yearly rent of this `Lease`.
    pub async fn rent_amount(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.lease(ctx).await?.rent_amount)
    }

    /// Security deposit of this `Lease`.
    pub async fn security_deposit(
        &self,
        ctx: &Context,
    ) -> Result<Money, Error> {
        Ok(self.lease(ctx).await?.security_deposit)
    }

    /// Ejari registration number of this `Lease`.
    pub async fn ejari_number(
        &self,
        ctx: &Context,
    ) -> Result<Option<EjariNumber>, Error> {
        Ok(self.lease(ctx).await?.ejari_number.clone().map(Into::into))
    }

    /// Ejari registration status of this `Lease`.
    pub async fn ejari_status(
        &self,
        ctx: &Context,
    ) -> Result<Option<EjariStatus>, Error> {
        Ok(self.lease(ctx).await?.ejari_status.clone().map(Into::into))
    }

    /// Uploaded contract document of this `Lease`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lease.contract",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn contract(
        &self,
        ctx: &Context,
    ) -> Result<Option<ContractDocument>, Error> {
        Ok(self.lease(ctx).await?.contract.as_ref().map(|c| {
            ContractDocument {
                url: c.url.clone().into(),
                uploaded_by: c.uploaded_by.into(),
                uploaded_at: c.uploaded_at.coerce(),
            }
        }))
    }

    /// Number of cheques the rent is split into.
    pub async fn cheque_count(
        &self,
        ctx: &Context,
    ) -> Result<Option<i32>, Error> {
        Ok(self
            .lease(ctx)
            .await?
            .cheque_count
            .map(|c| i32::from(c.get())))
    }

    /// Method of paying the rent.
    pub async fn payment_method(
        &self,
        ctx: &Context,
    ) -> Result<Option<PaymentMethod>, Error> {
        Ok(self.lease(ctx).await?.payment_method.map(Into::into))
    }

    /// Payment plan the installment schedule was generated from.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lease.paymentPlan",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn payment_plan(
        &self,
        ctx: &Context,
    ) -> Result<Option<PaymentPlan>, Error> {
        Ok(self.lease(ctx).await?.payment_plan.as_ref().map(Into::into))
    }

    /// Reason of terminating this `Lease`.
    pub async fn termination_reason(
        &self,
        ctx: &Context,
    ) -> Result<Option<Reason>, Error> {
        Ok(self
            .lease(ctx)
            .await?
            .termination
            .as_ref()
            .and_then(|t| t.reason.clone())
            .map(Into::into))
    }

    /// Notes of the move-out inspection.
    pub async fn move_out_inspection(
        &self,
        ctx: &Context,
    ) -> Result<Option<Inspection>, Error> {
        Ok(self
            .lease(ctx)
            .await?
            .termination
            .as_ref()
            .and_then(|t| t.move_out_inspection.clone())
            .map(Into::into))
    }

    /// `DateTime` when this `Lease` was terminated.
    pub async fn terminated_at(
        &self,
        ctx: &Context,
    ) -> Result<Option<DateTime>, Error> {
        Ok(self
            .lease(ctx)
            .await?
            .termination
            .as_ref()
            .map(|t| t.terminated_at.coerce()))
    }

    /// Installment schedule of this `Lease`, ordered by installment number.
    ///
    /// Visible to the tenant, the `Property` owner and admins only.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_LEASE_PARTICIPANT` - the current `User` neither rents nor
    ///                             manages this `Lease`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Lease.rentPayments",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn rent_payments(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::RentPayment>, Error> {
        let initiator = ctx.initiator().await?;
        let lease = self.lease(ctx).await?;
        if lease.tenant_id != initiator.id && !lease.is_managed_by(initiator) {
            return Err(api::PrivilegeError::LeaseParticipant.into())
                .map_err(ctx.error());
        }

        ctx.service()
            .execute(query::rent_payment::OfLease::by(lease.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ps| ps.into_iter().map(Into::into).collect())
    }

    /// `DateTime` when this `Lease` was created.
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.lease(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `Lease` was last modified.
    pub async fn updated_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.lease(ctx).await?.updated_at.coerce())
    }
}

/// Uploaded contract document of a `Lease`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "LeaseContractDocument")]
pub struct ContractDocument {
    /// URL of the document.
    pub url: DocumentUrl,

    /// `User` who uploaded the document.
    pub uploaded_by: api::user::Id,

    /// `DateTime` when the document was uploaded.
    pub uploaded_at: DateTime,
}

/// Payment plan of a `Lease`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "LeasePaymentPlan")]
pub struct PaymentPlan {
    /// Number of installments.
    pub cheque_count: i32,

    /// Months between two consecutive installments.
    pub interval_months: i32,

    /// Method of paying the installments.
    pub payment_method: Option<PaymentMethod>,

    /// Due date of the first installment.
    pub first_due_date: Date,

    /// Amount of every installment but the last.
    pub installment_amount: Money,

    /// Amount of the last installment.
    pub last_installment_amount: Money,

    /// Sum of all installments.
    pub total: Money,
}

impl From<&domain::lease::PaymentPlan> for PaymentPlan {
    fn from(plan: &domain::lease::PaymentPlan) -> Self {
        Self {
            cheque_count: plan.cheque_count.get().into(),
            interval_months: plan.interval_months.into(),
            payment_method: plan.payment_method.map(Into::into),
            first_due_date: plan.first_due_date,
            installment_amount: plan.installment_amount,
            last_installment_amount: plan.last_installment_amount,
            total: plan.total,
        }
    }
}

/// Unique identifier of a `Lease`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::lease::Id)]
#[into(domain::lease::Id)]
#[graphql(name = "LeaseId", transparent)]
pub struct Id(Uuid);

/// Ejari registration number of a `Lease`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "EjariNumber",
    with = scalar::Via::<domain::lease::EjariNumber>,
)]
pub struct EjariNumber(domain::lease::EjariNumber);

/// Ejari registration status of a `Lease`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "EjariStatus",
    with = scalar::Via::<domain::lease::EjariStatus>,
)]
pub struct EjariStatus(domain::lease::EjariStatus);

/// URL of a `Lease` contract document.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "LeaseDocumentUrl",
    with = scalar::Via::<domain::lease::DocumentUrl>,
)]
pub struct DocumentUrl(domain::lease::DocumentUrl);

/// Reason of a `Lease` termination.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "LeaseTerminationReason",
    with = scalar::Via::<domain::lease::Reason>,
)]
pub struct Reason(domain::lease::Reason);

/// Notes of a move-out inspection.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "MoveOutInspection",
    with = scalar::Via::<domain::lease::Inspection>,
)]
pub struct Inspection(domain::lease::Inspection);

/// Status of a `Lease`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "LeaseStatus")]
pub enum Status {
    /// Currently in force.
    Active,

    /// Ended before or at its end date.
    Terminated,

    /// Replaced by a successor `Lease`.
    Renewed,
}

impl From<domain::lease::Status> for Status {
    fn from(status: domain::lease::Status) -> Self {
        use domain::lease::Status as S;
        match status {
            S::Active => Self::Active,
            S::Terminated => Self::Terminated,
            S::Renewed => Self::Renewed,
        }
    }
}

/// Method of paying the rent of a `Lease`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "LeasePaymentMethod")]
pub enum PaymentMethod {
    /// Post-dated cheques.
    Cheque,

    /// Bank transfer.
    BankTransfer,

    /// Cash.
    Cash,

    /// Credit card.
    CreditCard,
}

impl From<domain::lease::PaymentMethod> for PaymentMethod {
    fn from(method: domain::lease::PaymentMethod) -> Self {
        use domain::lease::PaymentMethod as M;
        match method {
            M::Cheque => Self::Cheque,
            M::BankTransfer => Self::BankTransfer,
            M::Cash => Self::Cash,
            M::CreditCard => Self::CreditCard,
        }
    }
}

impl From<PaymentMethod> for domain::lease::PaymentMethod {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cheque => Self::Cheque,
            PaymentMethod::BankTransfer => Self::BankTransfer,
            PaymentMethod::Cash => Self::Cash,
            PaymentMethod::CreditCard => Self::CreditCard,
        }
    }
}
