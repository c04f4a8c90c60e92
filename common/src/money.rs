//! [`Money`]-related definitions.

use std::{fmt, iter, num::NonZeroU8, ops, str::FromStr};

use derive_more::{Display, Error};
use rust_decimal::{Decimal, RoundingStrategy};

/// Amount of money in the market currency (AED).
///
/// Never carries more than 2 fractional digits once produced by
/// [`Money::floor`] or parsed from a string.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount of [`Money`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new [`Money`] from the provided [`Decimal`] amount, rounded
    /// down to whole cents.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount).floor()
    }

    /// Returns the [`Decimal`] amount of this [`Money`].
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Money`] is strictly greater than zero.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Rounds this [`Money`] towards negative infinity at 2 decimal places.
    #[must_use]
    pub fn floor(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity),
        )
    }

    /// Divides this [`Money`] into `parts` equal shares, rounded down to whole
    /// cents.
    #[must_use]
    pub fn split(self, parts: NonZeroU8) -> Self {
        Self(self.0 / Decimal::from(parts.get())).floor()
    }

    /// Multiplies this [`Money`] by the provided number of times.
    #[must_use]
    pub fn times(self, n: u8) -> Self {
        Self(self.0 * Decimal::from(n))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| ParseError)?;
        if amount.scale() > 2 {
            return Err(ParseError);
        }
        Ok(Self(amount))
    }
}

/// Error of parsing [`Money`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("invalid `Money` amount")]
pub struct ParseError;

impl From<Money> for Decimal {
    fn from(m: Money) -> Self {
        m.0
    }
}

impl ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl ops::Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, ops::Add::add)
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use std::str::FromStr as _;

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

    use super::Money;

    impl Serialize for Money {
        fn serialize<S: serde::Serializer>(
            &self,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Money {
        fn deserialize<D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Self::from_str(&s).map_err(D::Error::custom)
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in AED in `{major}.{minor}` format, where:
    /// - `major` is an integer;
    /// - `minor` is an optional integer of at most 2 digits.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Money` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Money` input scalar: {e}")
                    })
                })
        }
    }
}
