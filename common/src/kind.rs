//! [`define_kind!`] macro.

/// Defines a closed enumeration stored as a `SMALLINT`, like a status or a
/// role.
///
/// Every variant gets an explicit non-zero discriminant, which is its stored
/// representation, so reordering variants never changes the stored data.
/// Variants are displayed and parsed in `snake_case`.
///
/// # Example
///
/// ```rust
/// # use crate::common::define_kind;
/// #
/// define_kind! {
///     #[doc = "Status of a lease."]
///     enum Status {
///         #[doc = "Currently in force."]
///         Active = 1,
///
///         #[doc = "Ended before its end date."]
///         Terminated = 2,
///     }
/// }
///
/// assert_eq!(Status::try_from(2), Ok(Status::Terminated));
/// assert_eq!(Status::Active.to_string(), "active");
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $crate::__kind_serde! {
            #[derive(
                Clone,
                Copy,
                Debug,
                $crate::private::strum::Display,
                $crate::private::strum::EnumIter,
                $crate::private::strum::EnumString,
                Eq,
                Hash,
                PartialEq,
            )]
            #[doc = $doc]
            #[repr(u8)]
            #[strum(serialize_all = "snake_case")]
            pub enum $name {
                $(
                     #[doc = $variant_doc]
                     $variant = $value,
                )*
            }
        }

        impl $name {
            /// Returns the stored representation of this value.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }
        }

        impl ::core::convert::TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(v: u8) -> Result<Self, Self::Error> {
                match v {
                    $(
                        v if Self::$variant.u8() == v => Ok(Self::$variant),
                    )*
                    v => Err(v),
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let raw = u8::try_from(i16::from_sql(ty, raw)?)?;
                Self::try_from(raw).map_err(|v| {
                    ::std::format!(
                        "unknown `{}` value: {v}",
                        ::core::stringify!($name),
                    )
                    .into()
                })
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                i16::from(self.u8()).to_sql(ty, w)
            }
        }
    };
}

/// Derives `serde` traits for a [`define_kind!`] enum, if `common` is built
/// with its `serde` feature.
///
/// The feature is checked here, in `common`, and not in the expansion, where
/// it would be checked against the features of the calling crate.
#[cfg(feature = "serde")]
#[doc(hidden)]
#[macro_export]
macro_rules! __kind_serde {
    ($kind:item) => {
        #[derive(
            $crate::private::serde::Deserialize,
            $crate::private::serde::Serialize,
        )]
        #[serde(rename_all = "snake_case")]
        $kind
    };
}

/// Leaves a [`define_kind!`] enum as is, since `common` is built without its
/// `serde` feature.
#[cfg(not(feature = "serde"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __kind_serde {
    ($kind:item) => {
        $kind
    };
}
