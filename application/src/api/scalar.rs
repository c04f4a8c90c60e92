//! Custom GraphQL scalars backed by domain text types.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Adapter for `#[graphql(with = ..)]` exposing a wrapper type as a string
/// scalar validated by the `As` domain type.
///
/// For example, an `EjariNumber` scalar is read by parsing the input string
/// as [`domain::lease::EjariNumber`] and converting the result into the API
/// wrapper, so an invalid registration number is rejected before any command
/// runs.
///
/// The wrapper must implement [`TryFrom`]`<As>` and [`AsRef`]`<As>`.
///
/// [`domain::lease::EjariNumber`]: service::domain::lease::EjariNumber
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Outputs the wrapped `As` value as a string.
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::scalar(value.as_ref().to_string())
    }

    /// Reads the wrapper from a string input.
    ///
    /// # Errors
    ///
    /// If the input is not a string, is not a valid `As` value, or is refused
    /// by the wrapper's [`TryFrom`] conversion.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let name = T::name(&()).unwrap_or("String");
        let Some(raw) = input.as_string_value() else {
            return Err(format!(
                "`{name}` scalar expects a string, found: {input}",
            ));
        };
        let parsed = raw.parse::<As>().map_err(|e| {
            format!("`{name}` scalar cannot be parsed from \"{raw}\": {e}")
        })?;
        T::try_from(parsed)
            .map_err(|e| format!("`{name}` scalar is invalid: {e}"))
    }

    /// Parses a literal token of the scalar as a string.
    ///
    /// # Errors
    ///
    /// If the token is not a string literal.
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}
