//! Domain definitions.

pub mod application;
pub mod lease;
pub mod notification;
pub mod property;
pub mod rent_payment;
pub mod user;

pub use self::{
    application::Application, lease::Lease, notification::Notification,
    property::Property, rent_payment::RentPayment, user::User,
};

/// Defines a trimmed, non-empty and length-limited text newtype.
macro_rules! define_text {
    (
        #[doc = $doc:literal]
        $name:ident(max = $max:literal)
    ) => {
        #[doc = $doc]
        #[derive(
            ::derive_more::AsRef,
            Clone,
            Debug,
            ::derive_more::Display,
            Eq,
            PartialEq,
            ::serde::Deserialize,
            ::serde::Serialize,
        )]
        #[as_ref(str, String)]
        #[serde(try_from = "String", into = "String")]
        #[cfg_attr(
            feature = "postgres",
            derive(::postgres_types::FromSql, ::postgres_types::ToSql),
            postgres(transparent),
        )]
        pub struct $name(String);

        impl $name {
            #[doc = ::core::concat!(
                "Creates a new [`", ::core::stringify!($name), "`].\n\n",
                "# Safety\n\n",
                "The caller must ensure that the given `value` matches the ",
                "format.",
            )]
            #[expect(unsafe_code, reason = "bypass")]
            #[must_use]
            pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[doc = ::core::concat!(
                "Creates a new [`", ::core::stringify!($name), "`] if the ",
                "given `value` is valid.",
            )]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let value = value.into();
                Self::check(&value).then_some(Self(value))
            }

            #[doc = ::core::concat!(
                "Checks whether the given `value` is a valid [`",
                ::core::stringify!($name), "`].",
            )]
            fn check(value: impl AsRef<str>) -> bool {
                let value = value.as_ref();
                value.trim() == value
                    && !value.is_empty()
                    && value.chars().count() <= $max
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s).ok_or(::core::concat!(
                    "invalid `", ::core::stringify!($name), "`",
                ))
            }
        }

        impl TryFrom<String> for $name {
            type Error = &'static str;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s).ok_or(::core::concat!(
                    "invalid `", ::core::stringify!($name), "`",
                ))
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

pub(crate) use define_text;
