//! Date and time utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{
    cmp::Ordering, fmt, marker::PhantomData, ops, str::FromStr,
    time::Duration,
};

use derive_more::{Debug, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{format_description::well_known::Rfc3339, UtcOffset};

/// Untyped date and time.
pub type DateTime = DateTimeOf;

/// UTC date and time.
#[derive(Debug)]
pub struct DateTimeOf<Of: ?Sized = ()> {
    /// Inner representation of the date and time.
    inner: time::OffsetDateTime,

    /// Type parameter describing the kind of date and time.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// A [`DateTime`] representing the Unix epoch.
    pub const UNIX_EPOCH: Self = Self {
        inner: time::OffsetDateTime::UNIX_EPOCH,
        _of: PhantomData,
    };

    /// Creates a new [`DateTime`] representing the current date and time.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn now() -> Self {
        let inner = time::OffsetDateTime::now_utc();
        Self {
            _of: PhantomData,
            inner: inner
                .replace_microsecond(inner.microsecond())
                .expect("infallible"),
        }
    }

    /// Creates a new [`DateTime`] from the provided [`UNIX_EPOCH`] timestamp.
    ///
    /// [`None`] is returned if the timestamp is invalid.
    ///
    /// [`UNIX_EPOCH`]: Self::UNIX_EPOCH
    #[must_use]
    pub fn from_unix_timestamp(timestamp: i64) -> Option<Self> {
        Some(Self {
            inner: time::OffsetDateTime::from_unix_timestamp(timestamp).ok()?,
            _of: PhantomData,
        })
    }

    /// Returns the [`UNIX_EPOCH`] timestamp of this [`DateTime`].
    ///
    /// [`UNIX_EPOCH`]: Self::UNIX_EPOCH
    #[must_use]
    pub fn unix_timestamp(&self) -> i64 {
        self.inner.unix_timestamp()
    }

    /// Creates a new [`DateTime`] from the provided [RFC 3339] string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid [RFC 3339] date and time.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub fn from_rfc3339(input: &str) -> Result<Self, ParseError> {
        use ParseError as E;

        time::OffsetDateTime::parse(input, &Rfc3339)
            .map_err(E::Parse)?
            .try_into()
            .map_err(E::ComponentRange)
    }

    /// Returns the [`DateTime`] as an [RFC 3339] string.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.inner.format(&Rfc3339).unwrap_or_else(|e| {
            panic!("cannot format `DateTime` as RFC 3339: {e}")
        })
    }

    /// Returns the UTC calendar [`Date`] of this [`DateTime`].
    #[must_use]
    pub fn date(&self) -> Date {
        Date(self.inner.date())
    }

    /// Coerces one kind of [`DateTime`] into another.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

/// Error of parsing [`DateTime`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ParseError {
    /// Failed to parse the string into an [`DateTime`].
    Parse(time::error::Parse),

    /// Parsed [`DateTime`] has an out of range component.
    ComponentRange(time::error::ComponentRange),
}

impl<Of: ?Sized> Copy for DateTimeOf<Of> {}
impl<Of: ?Sized> Clone for DateTimeOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateTimeOf<Of> {}
impl<Of: ?Sized> PartialEq for DateTimeOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> Ord for DateTimeOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateTimeOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> TryFrom<time::OffsetDateTime> for DateTimeOf<Of> {
    type Error = time::error::ComponentRange;

    fn try_from(dt: time::OffsetDateTime) -> Result<Self, Self::Error> {
        dt.to_offset(UtcOffset::UTC)
            .replace_microsecond(dt.microsecond())
            .map(|inner| Self {
                inner,
                _of: PhantomData,
            })
    }
}

impl<Of: ?Sized> From<DateTimeOf<Of>> for time::OffsetDateTime {
    fn from(dt: DateTimeOf<Of>) -> Self {
        dt.inner
    }
}

impl<Of: ?Sized> ops::Add<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner + rhs,
            _of: PhantomData,
        }
    }
}

impl<Of: ?Sized> ops::Sub for DateTimeOf<Of> {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        (self.inner - rhs.inner)
            .try_into()
            .expect("duration overflow")
    }
}

impl<Of: ?Sized> ops::Sub<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner - rhs,
            _of: PhantomData,
        }
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::OffsetDateTime::from_sql(ty, raw)?
            .try_into()
            .map_err(Box::from)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

/// Calendar date without a time zone.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Date(time::Date);

impl Date {
    /// Creates a new [`Date`] from the provided calendar components.
    ///
    /// [`None`] is returned if the components don't form a valid date.
    #[must_use]
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    /// Returns the current UTC [`Date`].
    #[must_use]
    pub fn today() -> Self {
        Self(time::OffsetDateTime::now_utc().date())
    }

    /// Returns the year of this [`Date`].
    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// Returns the month (1-12) of this [`Date`].
    #[must_use]
    pub fn month(self) -> u8 {
        self.0.month().into()
    }

    /// Returns the day of month of this [`Date`].
    #[must_use]
    pub fn day(self) -> u8 {
        self.0.day()
    }

    /// Adds the provided number of calendar months to this [`Date`].
    ///
    /// The day of month is clamped to the last day of the resulting month,
    /// so `2025-01-31` plus one month is `2025-02-28`.
    ///
    /// [`None`] is returned on overflow of the supported date range.
    #[must_use]
    pub fn checked_add_months(self, months: u32) -> Option<Self> {
        let zero_based = i64::from(self.0.year()) * 12
            + i64::from(self.month() - 1)
            + i64::from(months);
        let year = i32::try_from(zero_based.div_euclid(12)).ok()?;
        let month = u8::try_from(zero_based.rem_euclid(12) + 1).ok()?;
        let month = time::Month::try_from(month).ok()?;
        let day = self.0.day().min(time::util::days_in_year_month(year, month));
        time::Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    /// Adds the provided number of calendar years to this [`Date`], clamping
    /// February 29 to February 28 on non-leap years.
    #[must_use]
    pub fn checked_add_years(self, years: u16) -> Option<Self> {
        self.checked_add_months(u32::from(years) * 12)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year(),
            self.month(),
            self.day(),
        )
    }
}

impl FromStr for Date {
    type Err = DateParseError;

    /// Parses either a `YYYY-MM-DD` string or the date part of an
    /// [RFC 3339] date and time.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (date, rest) = match s.get(..10) {
            Some(date) => (date, &s[10..]),
            None if s.len() <= 10 => (s, ""),
            None => return Err(DateParseError),
        };
        if !rest.is_empty() {
            let rest = rest.strip_prefix(['T', 't', ' ']).ok_or(DateParseError)?;
            if rest.is_empty() {
                return Err(DateParseError);
            }
        }

        let mut parts = date.splitn(3, '-');
        let mut next = || parts.next().ok_or(DateParseError);
        let (year, month, day) = (next()?, next()?, next()?);
        if year.len() != 4 || month.len() != 2 || day.len() != 2 {
            return Err(DateParseError);
        }

        Self::from_ymd(
            year.parse().map_err(|_| DateParseError)?,
            month.parse().map_err(|_| DateParseError)?,
            day.parse().map_err(|_| DateParseError)?,
        )
        .ok_or(DateParseError)
    }
}

/// Error of parsing [`Date`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("invalid `Date`, expected `YYYY-MM-DD`")]
pub struct DateParseError;

impl<Of: ?Sized> From<DateTimeOf<Of>> for Date {
    fn from(dt: DateTimeOf<Of>) -> Self {
        dt.date()
    }
}

impl From<Date> for time::Date {
    fn from(d: Date) -> Self {
        d.0
    }
}

impl From<time::Date> for Date {
    fn from(d: time::Date) -> Self {
        Self(d)
    }
}

#[cfg(feature = "serde")]
pub mod serde {
    //! Module providing integration with [`serde`] crate.

    use std::str::FromStr as _;

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

    use super::{Date, DateTimeOf};

    impl Serialize for Date {
        fn serialize<S: serde::Serializer>(
            &self,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Date {
        fn deserialize<D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Self::from_str(&s).map_err(D::Error::custom)
        }
    }

    pub mod unix_timestamp {
        //! Module providing serialization and deserialization of [`DateTimeOf`]
        //! as a Unix timestamp.

        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        use super::DateTimeOf;

        /// Serializes the [`DateTimeOf`] as a Unix timestamp.
        ///
        /// # Errors
        ///
        /// Returns an error if the timestamp is invalid.
        pub fn serialize<Of, S>(
            dt: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            Of: ?Sized,
        {
            serializer.serialize_i64(dt.unix_timestamp())
        }

        /// Deserializes the Unix timestamp into a [`DateTimeOf`].
        ///
        /// # Errors
        ///
        /// Returns an error if the timestamp is invalid.
        pub fn deserialize<'de, D, Of>(
            deserializer: D,
        ) -> Result<DateTimeOf<Of>, D::Error>
        where
            D: Deserializer<'de>,
            Of: ?Sized,
        {
            DateTimeOf::from_unix_timestamp(i64::deserialize(deserializer)?)
                .ok_or_else(|| Error::custom("invalid timestamp"))
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Date and time in a [RFC 3339] format with a microsecond precision.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[graphql_scalar(with = Self, parse_token(String))]
    type DateTime = crate::DateTime;

    impl DateTime {
        fn to_output<S: ScalarValue>(dt: &DateTime) -> Value<S> {
            Value::scalar(dt.to_rfc3339())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `DateTime` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_rfc3339(s).map_err(|e| {
                        format!("Cannot parse `DateTime` input scalar: {e}")
                    })
                })
        }
    }

    /// Calendar date in `YYYY-MM-DD` format.
    ///
    /// Date and time in [RFC 3339] format is accepted as input, its date part
    /// is used.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[graphql_scalar(with = Self, parse_token(String))]
    type Date = crate::Date;

    impl Date {
        fn to_output<S: ScalarValue>(d: &Date) -> Value<S> {
            Value::scalar(d.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Date` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    s.parse().map_err(|e| {
                        format!("Cannot parse `Date` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use super::Date;

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    #[test]
    fn parses_plain_and_rfc3339() {
        assert_eq!(date("2025-03-01"), Date::from_ymd(2025, 3, 1).unwrap());
        assert_eq!(
            date("2025-03-01T10:00:00Z"),
            Date::from_ymd(2025, 3, 1).unwrap(),
        );

        assert!("2025-3-1".parse::<Date>().is_err());
        assert!("2025-02-30".parse::<Date>().is_err());
        assert!("2025-03-01garbage".parse::<Date>().is_err());
        assert!("not a date".parse::<Date>().is_err());
        assert!("".parse::<Date>().is_err());
    }

    #[test]
    fn displays_iso() {
        assert_eq!(date("2025-03-01").to_string(), "2025-03-01");
        assert_eq!(Date::from_ymd(987, 1, 9).unwrap().to_string(), "0987-01-09");
    }

    #[test]
    fn adds_months() {
        let d = date("2025-03-01");
        assert_eq!(d.checked_add_months(0), Some(d));
        assert_eq!(d.checked_add_months(3), Some(date("2025-06-01")));
        assert_eq!(d.checked_add_months(10), Some(date("2026-01-01")));
        assert_eq!(d.checked_add_months(12), Some(date("2026-03-01")));
    }

    #[test]
    fn clamps_to_month_end() {
        assert_eq!(
            date("2025-01-31").checked_add_months(1),
            Some(date("2025-02-28")),
        );
        assert_eq!(
            date("2024-01-31").checked_add_months(1),
            Some(date("2024-02-29")),
        );
        assert_eq!(
            date("2025-08-31").checked_add_months(1),
            Some(date("2025-09-30")),
        );
        assert_eq!(
            date("2024-02-29").checked_add_years(1),
            Some(date("2025-02-28")),
        );
    }
}
