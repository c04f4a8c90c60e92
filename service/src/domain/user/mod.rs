//! [`User`] definitions.

pub mod session;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// Platform user.
///
/// [`User`]s are registered outside of the tenancy lifecycle, so here they are
/// only read.
#[derive(Clone, Debug, From)]
pub struct User {
    /// ID of this [`User`]
    pub id: Id,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`Email`] of this [`User`].
    pub email: Option<Email>,

    /// [`Phone`] of this [`User`].
    pub phone: Option<Phone>,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

impl User {
    /// Returns the [`Initiator`] acting on behalf of this [`User`].
    #[must_use]
    pub fn as_initiator(&self) -> Initiator {
        Initiator {
            id: self.id,
            role: self.role,
        }
    }
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Role of a [`User`] on the platform."]
    enum Role {
        #[doc = "Rents properties and applies for them."]
        Tenant = 1,

        #[doc = "Lists properties and manages their tenancies."]
        Owner = 2,

        #[doc = "Platform administrator."]
        Admin = 3,
    }
}

impl Role {
    /// Indicates whether this [`Role`] is allowed to review applications and
    /// manage leases.
    #[must_use]
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

/// [`User`] performing an action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Initiator {
    /// ID of the acting [`User`].
    pub id: Id,

    /// [`Role`] of the acting [`User`].
    pub role: Role,
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Email address.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format: a local part, a
        /// single `@` and a dotted domain, without whitespace.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]{1,64}@[^\s@]+\.[^\s@.]+$")
                .expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 254 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Phone number.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Phone`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Phone`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Phone`] format: an optional `+`
        /// followed by 7 to 15 digits, optionally grouped by spaces or dashes.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\+?\d(?:[-\s]?\d){6,14}$").expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// Association between an owner and a tenant, established by the tenant's
/// first application for one of the owner's properties.
#[derive(Clone, Copy, Debug)]
pub struct Association {
    /// ID of the owner [`User`].
    pub owner_id: Id,

    /// ID of the tenant [`User`].
    pub tenant_id: Id,

    /// [`DateTime`] when this [`Association`] was established.
    pub created_at: DateTimeOf<(Association, unit::Creation)>,
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;
