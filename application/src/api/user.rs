//! [`User`] of the GraphQL API: tenants, owners and admins.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, Query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A [`User`] of the system.
#[derive(Clone, Debug, From)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`domain::User`] representing this [`User`].
    user: OnceCell<domain::User>,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id.into(),
            user: OnceCell::new_with(Some(user)),
        }
    }
}

impl User {
    /// Creates a new [`User`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`User`] with the provided ID exists,
    /// otherwise accessing this [`User`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            user: OnceCell::new(),
        }
    }

    /// Loads the [`domain::User`] behind this [`User`], once per request.
    ///
    /// # Errors
    ///
    /// If the [`domain::User`] doesn't exist.
    async fn user(&self, ctx: &Context) -> Result<&domain::User, Error> {
        self.user
            .get_or_try_init(|| async {
                let user = ctx
                    .service()
                    .execute(query::user::ById::by(self.id.into()))
                    .await
                    .map_err(AsError::into_error)?;
                user.ok_or_else(|| {
                    Error::from(api::query::UserError::NotExists)
                })
            })
            .await
            .map_err(ctx.error())
    }

    /// Reads a contact detail of this [`User`].
    ///
    /// Contacts are shown to the [`User`] themselves and to managers only,
    /// [`None`] is returned for anyone else.
    async fn contact<T>(
        &self,
        ctx: &Context,
        read: impl FnOnce(&domain::User) -> Option<T>,
    ) -> Result<Option<T>, Error> {
        let is_visible = ctx.try_initiator().await?.is_some_and(|i| {
            Id::from(i.id) == self.id || i.role.is_manager()
        });
        if !is_visible {
            return Ok(None);
        }
        Ok(read(self.user(ctx).await?))
    }
}

/// A `User` of the system.
#[graphql_object(context = Context)]
impl User {
    /// Unique identifier of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Role of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.role",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn role(&self, ctx: &Context) -> Result<Role, Error> {
        Ok(self.user(ctx).await?.role.into())
    }

    /// Name of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.user(ctx).await?.name.clone().into())
    }

    /// Email of this `User`.
    ///
    /// Visible to this `User` itself, owners and admins only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.email",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn email(&self, ctx: &Context) -> Result<Option<Email>, Error> {
        self.contact(ctx, |u| u.email.clone().map(Into::into)).await
    }

    /// Phone of this `User`.
    ///
    /// Visible to this `User` itself, owners and admins only.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.phone",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn phone(&self, ctx: &Context) -> Result<Option<Phone>, Error> {
        self.contact(ctx, |u| u.phone.clone().map(Into::into)).await
    }

    /// `DateTime` when this `User` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.user(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `User`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::user::Id)]
#[into(domain::user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct Id(Uuid);

/// Role of a `User`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "UserRole")]
pub enum Role {
    /// Rents properties.
    Tenant,

    /// Owns properties.
    Owner,

    /// Administers the platform.
    Admin,
}

impl From<domain::user::Role> for Role {
    fn from(role: domain::user::Role) -> Self {
        use domain::user::Role as R;
        match role {
            R::Tenant => Self::Tenant,
            R::Owner => Self::Owner,
            R::Admin => Self::Admin,
        }
    }
}

/// Name of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserName",
    with = scalar::Via::<domain::user::Name>,
)]
pub struct Name(domain::user::Name);

/// Email of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserEmail",
    with = scalar::Via::<domain::user::Email>,
)]
pub struct Email(domain::user::Email);

/// Phone of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserPhone",
    with = scalar::Via::<domain::user::Phone>,
)]
pub struct Phone(domain::user::Phone);
