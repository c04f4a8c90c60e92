//! [`Property`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Lease;
use crate::domain::{define_text, lease, user};

/// Rentable unit listed by an owner.
///
/// [`Status::Occupied`] holds if and only if exactly one active [`Lease`]
/// references this [`Property`], and [`Property::current_lease_id`] points to
/// it. Mutations of the occupancy go through [`Property::occupy()`],
/// [`Property::hand_over()`] and [`Property::release()`] only.
#[derive(Clone, Debug)]
pub struct Property {
    /// ID of this [`Property`].
    pub id: Id,

    /// ID of the owner of this [`Property`].
    pub owner_id: user::Id,

    /// [`Name`] of this [`Property`].
    pub name: Name,

    /// [`Status`] of this [`Property`].
    pub(crate) status: Status,

    /// ID of the active [`Lease`] occupying this [`Property`], if any.
    pub(crate) current_lease_id: Option<lease::Id>,

    /// List price of this [`Property`] for a year of rent.
    pub price: Money,

    /// [`DateTime`] when this [`Property`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Property`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Property {
    /// Creates a new [`Status::Vacant`] [`Property`].
    #[must_use]
    pub fn new(owner_id: user::Id, name: Name, price: Money) -> Self {
        let now = common::DateTime::now();
        Self {
            id: Id::new(),
            owner_id,
            name,
            status: Status::Vacant,
            current_lease_id: None,
            price,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    /// Returns [`Status`] of this [`Property`].
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Returns ID of the [`Lease`] currently occupying this [`Property`].
    #[must_use]
    pub const fn current_lease_id(&self) -> Option<lease::Id> {
        self.current_lease_id
    }

    /// Indicates whether this [`Property`] is occupied.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        matches!(self.status, Status::Occupied)
    }

    /// Indicates whether the provided [`user::Initiator`] manages this
    /// [`Property`], being its owner or an admin.
    #[must_use]
    pub fn is_managed_by(&self, initiator: user::Initiator) -> bool {
        match initiator.role {
            user::Role::Admin => true,
            user::Role::Owner => initiator.id == self.owner_id,
            user::Role::Tenant => false,
        }
    }

    /// Occupies this [`Property`] with the provided active [`Lease`].
    ///
    /// # Errors
    ///
    /// If this [`Property`] is already occupied by another [`Lease`].
    pub fn occupy(
        &mut self,
        lease_id: lease::Id,
        at: ModificationDateTime,
    ) -> Result<(), AlreadyOccupied> {
        if self.is_occupied() && self.current_lease_id != Some(lease_id) {
            return Err(AlreadyOccupied(self.id));
        }
        self.status = Status::Occupied;
        self.current_lease_id = Some(lease_id);
        self.updated_at = at;
        Ok(())
    }

    /// Hands this [`Property`] over to the successor of its current [`Lease`].
    pub fn hand_over(&mut self, lease_id: lease::Id, at: ModificationDateTime) {
        self.status = Status::Occupied;
        self.current_lease_id = Some(lease_id);
        self.updated_at = at;
    }

    /// Releases this [`Property`] from its [`Lease`], putting it into the
    /// provided non-occupied [`Status`].
    ///
    /// # Errors
    ///
    /// If the provided [`Status`] is [`Status::Occupied`].
    pub fn release(
        &mut self,
        status: Status,
        at: ModificationDateTime,
    ) -> Result<(), OccupiedWithoutLease> {
        if matches!(status, Status::Occupied) {
            return Err(OccupiedWithoutLease(self.id));
        }
        self.status = status;
        self.current_lease_id = None;
        self.updated_at = at;
        Ok(())
    }

    /// Releases this [`Property`] into [`Status::Vacant`].
    pub fn vacate(&mut self, at: ModificationDateTime) {
        self.status = Status::Vacant;
        self.current_lease_id = None;
        self.updated_at = at;
    }
}

/// ID of a [`Property`].
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

define_text! {
    #[doc = "Name of a [`Property`]."]
    Name(max = 512)
}

define_kind! {
    #[doc = "Status of a [`Property`]."]
    enum Status {
        #[doc = "Listed and free to be leased."]
        Vacant = 1,

        #[doc = "Leased by an active [`Lease`]."]
        Occupied = 2,

        #[doc = "Temporarily withdrawn for maintenance."]
        UnderMaintenance = 3,

        #[doc = "Withdrawn from the market."]
        Unavailable = 4,

        #[doc = "Sold and not rentable anymore."]
        Sold = 5,
    }
}

/// Error of occupying an already occupied [`Property`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Property(id: {_0})` is already occupied by another `Lease`")]
pub struct AlreadyOccupied(#[error(not(source))] pub Id);

/// Error of putting a [`Property`] into [`Status::Occupied`] without a
/// [`Lease`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Property(id: {_0})` cannot be occupied without an active `Lease`")]
pub struct OccupiedWithoutLease(#[error(not(source))] pub Id);

/// [`DateTime`] when a [`Property`] was created.
pub type CreationDateTime = DateTimeOf<(Property, unit::Creation)>;

/// [`DateTime`] when a [`Property`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Property, unit::Modification)>;

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use super::{Name, Property, Status};
    use crate::domain::{lease, user};

    fn property() -> Property {
        Property::new(
            user::Id::new(),
            Name::new("Marina View 1204").unwrap(),
            "120000".parse::<Money>().unwrap(),
        )
    }

    #[test]
    fn occupies_vacant() {
        let mut p = property();
        let lease = lease::Id::new();

        p.occupy(lease, DateTime::now().coerce()).unwrap();

        assert_eq!(p.status(), Status::Occupied);
        assert_eq!(p.current_lease_id(), Some(lease));
    }

    #[test]
    fn refuses_double_occupation() {
        let mut p = property();
        p.occupy(lease::Id::new(), DateTime::now().coerce()).unwrap();

        assert!(p.occupy(lease::Id::new(), DateTime::now().coerce()).is_err());
    }

    #[test]
    fn releases_into_non_occupied_status_only() {
        let mut p = property();
        p.occupy(lease::Id::new(), DateTime::now().coerce()).unwrap();

        assert!(p.release(Status::Occupied, DateTime::now().coerce()).is_err());
        assert!(p.is_occupied());

        p.release(Status::Sold, DateTime::now().coerce()).unwrap();
        assert_eq!(p.status(), Status::Sold);
        assert_eq!(p.current_lease_id(), None);
    }

    #[test]
    fn is_managed_by_owner_and_admin() {
        let p = property();
        let owner = user::Initiator {
            id: p.owner_id,
            role: user::Role::Owner,
        };
        let other_owner = user::Initiator {
            id: user::Id::new(),
            role: user::Role::Owner,
        };
        let admin = user::Initiator {
            id: user::Id::new(),
            role: user::Role::Admin,
        };
        let tenant = user::Initiator {
            id: p.owner_id,
            role: user::Role::Tenant,
        };

        assert!(p.is_managed_by(owner));
        assert!(!p.is_managed_by(other_owner));
        assert!(p.is_managed_by(admin));
        assert!(!p.is_managed_by(tenant));
    }
}
