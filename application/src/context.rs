//! Per-request [`Context`] of the GraphQL API.

use std::sync::atomic::{self, AtomicU16};

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use service::{
    command::{self, Command as _},
    domain::user::{self, session},
};
use tokio::sync::OnceCell;

use crate::{define_error, AsError, Error, JuniperResponse, Service};

/// Outcome of authenticating the request, resolved at most once.
type Authentication = Result<Option<user::Initiator>, Error>;

/// Per-request context shared by all GraphQL resolvers.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] executing commands and queries.
    service: Service,

    /// HTTP status code to respond with if any resolver fails.
    error_status_code: AtomicU16,

    /// Parts of the HTTP request.
    parts: http::request::Parts,

    /// Memoized [`Authentication`] of the request.
    authentication: OnceCell<Authentication>,
}

impl Context {
    /// Returns the [`Service`] of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the HTTP status code to respond with on failure.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .expect("stored from a valid `StatusCode`")
    }

    /// Makes the response carry the provided [`http::StatusCode`].
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Returns a [`Result::map_err()`] closure recording the status code of
    /// the passed [`Error`].
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Returns the [`user::Initiator`] of the request, if it carries any
    /// credentials.
    ///
    /// # Errors
    ///
    /// If the provided bearer token is malformed, expired, or refers to a
    /// missing `User`.
    pub async fn try_initiator(
        &self,
    ) -> Result<Option<user::Initiator>, Error> {
        self.authentication
            .get_or_init(|| self.authenticate())
            .await
            .clone()
    }

    /// Returns the [`user::Initiator`] of the request.
    ///
    /// # Errors
    ///
    /// If the request is anonymous, or its credentials are invalid.
    pub async fn initiator(&self) -> Result<user::Initiator, Error> {
        self.try_initiator()
            .await?
            .ok_or_else(|| AuthError::AuthorizationRequired.into())
            .map_err(self.error())
    }

    /// Resolves the bearer token of the request into a
    /// [`user::Initiator`].
    async fn authenticate(&self) -> Authentication {
        let header = self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await;
        let bearer = match header {
            Ok(TypedHeader(Authorization(bearer))) => bearer,
            Err(e) if e.is_missing() => return Ok(None),
            Err(e) => return Err(e.into_error()).map_err(self.error()),
        };

        #[expect(unsafe_code, reason = "extracted from `Bearer` header")]
        let token =
            unsafe { session::Token::new_unchecked(bearer.token().to_owned()) };
        let initiator = self
            .service
            .execute(command::AuthorizeUserSession { token })
            .await
            .map_err(AsError::into_error)
            .map_err(self.error())?;
        tracing::debug!(
            user.id = %initiator.id,
            user.role = ?initiator.role,
            "request authenticated",
        );
        Ok(Some(initiator))
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let Some(service) = parts.extensions.get::<Service>().cloned() else {
            let err = Error::internal(&"`Service` is not attached to request");
            return Err(JuniperResponse {
                status_code: err.status_code,
                response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                    err.into_field_error(),
                )),
            });
        };

        Ok(Self {
            service,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            parts: parts.clone(),
            authentication: OnceCell::new(),
        })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::InvalidToken.into())
            }
            Self::UserNotExists(_) => Some(AuthError::UnknownUser.into()),
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Session token is malformed or expired"]
        InvalidToken,

        #[code = "UNKNOWN_USER"]
        #[status = UNAUTHORIZED]
        #[message = "Session token refers to a missing `User`"]
        UnknownUser,
    }
}
