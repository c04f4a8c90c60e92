//! [`Property`]-related definitions.

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::{future, TryFutureExt as _};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A rentable property.
#[derive(Clone, Debug, From)]
pub struct Property {
    /// ID of this [`Property`].
    id: Id,

    /// Underlying [`domain::Property`].
    property: OnceCell<domain::Property>,
}

impl From<domain::Property> for Property {
    fn from(property: domain::Property) -> Self {
        Self {
            id: property.id.into(),
            property: OnceCell::new_with(Some(property)),
        }
    }
}

impl Property {
    /// Creates a new [`Property`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Property`] with the provided ID exists,
    /// otherwise accessing this [`Property`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            property: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Property`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Property`] doesn't exist.
    async fn property(
        &self,
        ctx: &Context,
    ) -> Result<&domain::Property, Error> {
        let id = self.id.into();
        self.property
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::property::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|p| {
                        future::ready(p.ok_or_else(|| {
                            api::query::PropertyError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A rentable property.
#[graphql_object(context = Context)]
impl Property {
    /// Unique identifier of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Owner of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.owner",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn owner(&self, ctx: &Context) -> Result<api::User, Error> {
        let owner_id = self.property(ctx).await?.owner_id;
        #[expect(unsafe_code, reason = "`Property` references existing owner")]
        Ok(unsafe { api::User::new_unchecked(owner_id) })
    }

    /// Name of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.property(ctx).await?.name.clone().into())
    }

    /// Occupancy status of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.property(ctx).await?.status().into())
    }

    /// Yearly list price of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.price",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn price(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.property(ctx).await?.price)
    }

    /// Active `Lease` occupying this `Property`, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.currentLease",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn current_lease(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Lease>, Error> {
        ctx.service()
            .execute(query::lease::ActiveOfProperty::by(self.id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|l| l.map(|active| active.0.into()))
    }

    /// `Application`s made for this `Property`, oldest first.
    ///
    /// Visible to the owner of this `Property` and admins only.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_PROPERTY_MANAGER` - the current `User` is neither the owner of
    ///                            this `Property` nor an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.applications",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn applications(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Application>, Error> {
        let initiator = ctx.initiator().await?;
        if !self.property(ctx).await?.is_managed_by(initiator) {
            return Err(api::PrivilegeError::PropertyManager.into())
                .map_err(ctx.error());
        }

        ctx.service()
            .execute(query::application::OfProperty::by(self.id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|apps| apps.into_iter().map(Into::into).collect())
    }

    /// `DateTime` when this `Property` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.property(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when this `Property` was last modified.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.updatedAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn updated_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.property(ctx).await?.updated_at.coerce())
    }
}

/// Unique identifier of a `Property`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::property::Id)]
#[into(domain::property::Id)]
#[graphql(name = "PropertyId", transparent)]
pub struct Id(Uuid);

/// Name of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyName",
    with = scalar::Via::<domain::property::Name>,
)]
pub struct Name(domain::property::Name);

/// Occupancy status of a `Property`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "PropertyStatus")]
pub enum Status {
    /// Listed and free to be leased.
    Vacant,

    /// Leased by an active `Lease`.
    Occupied,

    /// Temporarily withdrawn for maintenance.
    UnderMaintenance,

    /// Withdrawn from the market.
    Unavailable,

    /// Sold and not rentable anymore.
    Sold,
}

impl From<domain::property::Status> for Status {
    fn from(status: domain::property::Status) -> Self {
        use domain::property::Status as S;
        match status {
            S::Vacant => Self::Vacant,
            S::Occupied => Self::Occupied,
            S::UnderMaintenance => Self::UnderMaintenance,
            S::Unavailable => Self::Unavailable,
            S::Sold => Self::Sold,
        }
    }
}

impl From<Status> for domain::property::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Vacant => Self::Vacant,
            Status::Occupied => Self::Occupied,
            Status::UnderMaintenance => Self::UnderMaintenance,
            Status::Unavailable => Self::Unavailable,
            Status::Sold => Self::Sold,
        }
    }
}
