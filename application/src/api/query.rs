//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently authenticated `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_user(ctx: &Context) -> Result<api::User, Error> {
        let my_id = ctx.initiator().await?.id;
        ctx.service()
            .execute(query::user::ById::by(my_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `User` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "user",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(query::user::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Property` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` with the specified ID does
    ///                           not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "property",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn property(
        id: api::property::Id,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        ctx.service()
            .execute(query::property::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| PropertyError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Application` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `APPLICATION_NOT_EXISTS` - the `Application` with the specified ID
    ///                              does not exist or is not visible to the
    ///                              current `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "application",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn application(
        id: api::application::Id,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let initiator = ctx.initiator().await?;

        let application = ctx
            .service()
            .execute(query::application::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ApplicationError::NotExists.into())
            .map_err(ctx.error())?;
        if application.tenant_id != initiator.id {
            let is_managed = ctx
                .service()
                .execute(query::property::ById::by(application.property_id))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())?
                .is_some_and(|p| p.is_managed_by(initiator));
            if !is_managed {
                return Err(ApplicationError::NotExists.into())
                    .map_err(ctx.error());
            }
        }

        Ok(application.into())
    }

    /// Returns the `Lease` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LEASE_NOT_EXISTS` - the `Lease` with the specified ID does not exist
    ///                        or is not visible to the current `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "lease",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn lease(
        id: api::lease::Id,
        ctx: &Context,
    ) -> Result<api::Lease, Error> {
        let initiator = ctx.initiator().await?;

        let lease = ctx
            .service()
            .execute(query::lease::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .filter(|l| l.tenant_id == initiator.id || l.is_managed_by(initiator))
            .ok_or_else(|| LeaseError::NotExists.into())
            .map_err(ctx.error())?;

        Ok(lease.into())
    }

    /// Returns the `RentPayment` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RENT_PAYMENT_NOT_EXISTS` - the `RentPayment` with the specified ID
    ///                               does not exist or is not visible to the
    ///                               current `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "rentPayment",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn rent_payment(
        id: api::rent_payment::Id,
        ctx: &Context,
    ) -> Result<api::RentPayment, Error> {
        let initiator = ctx.initiator().await?;

        let payment = ctx
            .service()
            .execute(query::rent_payment::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| RentPaymentError::NotExists.into())
            .map_err(ctx.error())?;
        let is_visible = ctx
            .service()
            .execute(query::lease::ById::by(payment.lease_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .is_some_and(|l| {
                l.tenant_id == initiator.id || l.is_managed_by(initiator)
            });
        if !is_visible {
            return Err(RentPaymentError::NotExists.into())
                .map_err(ctx.error());
        }

        Ok(payment.into())
    }
}

define_error! {
    enum ApplicationError {
        #[code = "APPLICATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Application` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum LeaseError {
        #[code = "LEASE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Lease` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum PropertyError {
        #[code = "PROPERTY_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Property` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum RentPaymentError {
        #[code = "RENT_PAYMENT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`RentPayment` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}
