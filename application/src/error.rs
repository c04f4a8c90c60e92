//! [`Error`]s reported by the GraphQL API.

use std::fmt;

use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use juniper::IntoFieldError;
use service::infra::database;
use tracerr::{Trace, Traced};

/// Defines a [`Copy`] enum of client-facing errors, each variant of which
/// converts into an [`Error`] with its own code, HTTP status and message.
///
/// ```ignore
/// define_error! {
///     enum LeaseError {
///         #[code = "LEASE_NOT_ACTIVE"]
///         #[status = CONFLICT]
///         #[message = "`Lease` is not active"]
///         NotActive,
///     }
/// }
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Client-facing error.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                let (code, status_code) = match err {
                    $(
                        $name::$variant => {
                            ($code, ::http::StatusCode::$status_code)
                        }
                    )*
                };
                Self::new(code, status_code, &err)
            }
        }
    };
}

/// Error of a GraphQL API operation.
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// Machine-readable [`Code`] of this [`Error`].
    pub code: Code,

    /// HTTP status to respond with.
    pub status_code: http::StatusCode,

    /// Where this [`Error`] originated from, if traced.
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// Human-readable description.
    pub message: String,
}

impl Error {
    /// Creates a new untraced [`Error`].
    #[must_use]
    pub fn new(
        code: Code,
        status_code: http::StatusCode,
        message: &impl ToString,
    ) -> Self {
        Self {
            code,
            status_code,
            message: message.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] for a failure the client cannot fix.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self::new(
            "INTERNAL_SERVER_ERROR",
            http::StatusCode::INTERNAL_SERVER_ERROR,
            msg,
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.code, self.message)?;
        if let Some(trace) = &self.backtrace {
            write!(
                f,
                "\n{}",
                trace
                    .iter()
                    .format_with("\n", |frame, f| f(&format_args!("{frame}"))),
            )?;
        }
        Ok(())
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let frames = self
            .backtrace
            .iter()
            .flat_map(|trace| trace.iter())
            .map(|frame| juniper::Value::scalar(frame.to_string()))
            .collect();

        let mut ext = juniper::Object::with_capacity(2);
        drop(
            ext.add_field("code", juniper::Value::scalar(self.code.to_owned())),
        );
        drop(ext.add_field("backtrace", juniper::Value::list(frames)));
        juniper::FieldError::new(self.message, juniper::Value::object(ext))
    }
}

/// Machine-readable code of an [`Error`], like `LEASE_NOT_ACTIVE`.
pub type Code = &'static str;

/// Conversion of operation errors into client-facing [`Error`]s.
pub trait AsError {
    /// Returns the client-facing [`Error`] for this one.
    ///
    /// [`None`] means the failure is internal and its details must not reach
    /// the client.
    fn try_as_error(&self) -> Option<Error>;

    /// Returns the client-facing [`Error`], masking internal failures as
    /// [`Error::internal()`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Same as [`AsError::as_error()`], but consumes this error.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::new(
            "BAD_REQUEST",
            http::StatusCode::BAD_REQUEST,
            self,
        ))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, IntoFieldError as _};

    use super::{AsError, Error};

    crate::define_error! {
        enum LeaseError {
            #[code = "LEASE_NOT_ACTIVE"]
            #[status = CONFLICT]
            #[message = "`Lease` is not active"]
            NotActive,
        }
    }

    #[derive(Debug, derive_more::Display)]
    #[display("connection reset")]
    struct Internal;

    impl AsError for Internal {
        fn try_as_error(&self) -> Option<Error> {
            None
        }
    }

    #[test]
    fn carries_code_status_and_message() {
        let err = Error::from(LeaseError::NotActive);

        assert_eq!(err.code, "LEASE_NOT_ACTIVE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "[LEASE_NOT_ACTIVE]: `Lease` is not active",
        );
    }

    #[test]
    fn masks_internal_failures() {
        let err = Internal.into_error();

        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "connection reset");
    }

    #[test]
    fn exposes_code_in_extensions() {
        let field: juniper::FieldError<DefaultScalarValue> =
            Error::from(LeaseError::NotActive).into_field_error();

        assert_eq!(field.message(), "`Lease` is not active");
        let code = field
            .extensions()
            .as_object_value()
            .and_then(|ext| ext.get_field_value("code"))
            .and_then(|code| code.as_string_value());
        assert_eq!(code, Some("LEASE_NOT_ACTIVE"));
    }
}
