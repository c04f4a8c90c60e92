//! In-memory [`Database`] implementation.
//!
//! Transactions are serialized: [`Transact`] waits for the previous
//! transaction to finish and works on a snapshot of the committed [`State`],
//! which replaces the committed one on [`Commit`] only.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::{
    operations::{By, Commit, Delete, Insert, Lock, Select, Transact, Update},
    Date, DateTime,
};
use tokio::sync::OwnedMutexGuard;
use tracerr::Traced;

use crate::{
    command::{SubmitApplication, UpdateApplicationStatus},
    domain::{
        application, lease, property, rent_payment, user, Application, Lease,
        Notification, Property, RentPayment, User,
    },
    infra::{database, Database},
    read::{lease::Active, notification::Undelivered, rent_payment::Overdue},
    task, Config, Service,
};

/// Stored rows.
#[derive(Clone, Debug, Default)]
pub(crate) struct State {
    /// Registered [`User`]s.
    pub(crate) users: Vec<User>,

    /// Listed [`Property`]s.
    pub(crate) properties: Vec<Property>,

    /// Submitted [`Application`]s in their submission order.
    pub(crate) applications: Vec<Application>,

    /// Opened [`Lease`]s.
    pub(crate) leases: Vec<Lease>,

    /// Scheduled [`RentPayment`]s.
    pub(crate) rent_payments: Vec<RentPayment>,

    /// Established owner-tenant [`user::Association`]s.
    pub(crate) associations: Vec<user::Association>,

    /// Queued [`Notification`]s in their queueing order.
    pub(crate) notifications: Vec<Notification>,
}

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Memory<C = NonTx> {
    /// Committed [`State`].
    committed: Arc<Mutex<State>>,

    /// Lock serializing transactions.
    serial: Arc<tokio::sync::Mutex<()>>,

    /// [`Connection`] of this [`Memory`].
    conn: C,
}

/// [`Connection`] operating on the committed [`State`] directly.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct NonTx;

/// [`Connection`] operating on a transaction snapshot.
#[derive(Clone, Debug)]
pub(crate) struct Tx {
    /// Snapshot of the [`State`] modified by this transaction.
    staged: Arc<Mutex<State>>,

    /// Guard of [`Memory::serial`] held until this transaction is dropped.
    _serial: Arc<OwnedMutexGuard<()>>,
}

/// Access to the [`State`] of a [`Memory`].
pub(crate) trait Connection {
    /// Locks the [`State`] this [`Connection`] operates on.
    fn state<'s>(&'s self, committed: &'s Mutex<State>)
        -> MutexGuard<'s, State>;
}

impl Connection for NonTx {
    fn state<'s>(
        &'s self,
        committed: &'s Mutex<State>,
    ) -> MutexGuard<'s, State> {
        committed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connection for Tx {
    fn state<'s>(&'s self, _: &'s Mutex<State>) -> MutexGuard<'s, State> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Connection> Memory<C> {
    /// Runs the provided function upon the [`State`] of this [`Memory`].
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.conn.state(&self.committed))
    }
}

impl Memory {
    /// Seeds the committed [`State`] with the provided function.
    pub(crate) fn seed(&self, f: impl FnOnce(&mut State)) {
        self.with(f);
    }

    /// Returns a snapshot of the committed [`State`].
    pub(crate) fn snapshot(&self) -> State {
        self.with(|s| s.clone())
    }
}

impl State {
    /// Returns the stored [`Application`] with the provided ID.
    pub(crate) fn application(&self, id: application::Id) -> &Application {
        self.applications
            .iter()
            .find(|a| a.id == id)
            .expect("`Application` should exist")
    }

    /// Returns the stored [`Property`] with the provided ID.
    pub(crate) fn property(&self, id: property::Id) -> &Property {
        self.properties
            .iter()
            .find(|p| p.id == id)
            .expect("`Property` should exist")
    }

    /// Returns the stored [`Lease`] with the provided ID.
    pub(crate) fn lease(&self, id: lease::Id) -> &Lease {
        self.leases
            .iter()
            .find(|l| l.id == id)
            .expect("`Lease` should exist")
    }

    /// Returns the stored [`RentPayment`]s of the [`Lease`] with the provided
    /// ID.
    pub(crate) fn payments_of(&self, id: lease::Id) -> Vec<&RentPayment> {
        self.rent_payments.iter().filter(|p| p.lease_id == id).collect()
    }

    /// Returns names of the [`Notification`]s queued for the [`User`] with
    /// the provided ID.
    pub(crate) fn notified(&self, id: user::Id) -> Vec<&'static str> {
        self.notifications
            .iter()
            .filter(|n| n.recipient_id == id)
            .map(|n| n.event.name())
            .collect()
    }
}

impl Memory {
    /// Registers a new [`User`] with the provided [`user::Role`].
    pub(crate) fn user(&self, role: user::Role) -> user::Initiator {
        let user = User {
            id: user::Id::new(),
            role,
            name: user::Name::new("Aisha Rahman").expect("valid `Name`"),
            email: None,
            phone: None,
            created_at: DateTime::now().coerce(),
        };
        let initiator = user.as_initiator();
        self.seed(|s| s.users.push(user));
        initiator
    }

    /// Lists a new [`Property`] of the provided owner for the provided yearly
    /// `price`.
    pub(crate) fn property(&self, owner_id: user::Id, price: &str) -> Property {
        let property = Property::new(
            owner_id,
            property::Name::new("Marina View 1204").expect("valid `Name`"),
            price.parse().expect("valid `Money`"),
        );
        self.seed(|s| s.properties.push(property.clone()));
        property
    }
}

/// Creates a new [`SubmitApplication`] of the provided tenant with both
/// identity documents present.
pub(crate) fn submission(
    property_id: property::Id,
    initiator: user::Initiator,
) -> SubmitApplication {
    SubmitApplication {
        property_id,
        initiator,
        full_name: user::Name::new("Omar Haddad").expect("valid `Name`"),
        email: user::Email::new("omar@example.com"),
        phone: None,
        national_id: application::DocumentNumber::new("784-1990-1234567-1"),
        passport_number: application::DocumentNumber::new("N1234567"),
        message: None,
        offer_amount: None,
        move_in_date: None,
    }
}

/// Lists a new [`Property`] of the provided owner and leases it to a new
/// tenant through an approved [`Application`].
pub(crate) async fn leased(
    svc: &Service<Memory>,
    owner: user::Initiator,
    price: &str,
) -> Lease {
    let db = svc.database();
    let property = db.property(owner.id, price);
    let tenant = db.user(user::Role::Tenant);
    let application = svc
        .execute(submission(property.id, tenant))
        .await
        .expect("`Application` should be submitted");
    _ = svc
        .execute(UpdateApplicationStatus {
            application_id: application.id,
            status: application::Status::Approved,
            initiator: owner,
            rejection_reason: None,
            start_date: Some(Date::from_ymd(2025, 1, 1).expect("valid `Date`")),
            end_date: Some(Date::from_ymd(2026, 1, 1).expect("valid `Date`")),
        })
        .await
        .expect("`Application` should be approved");
    db.snapshot()
        .leases
        .into_iter()
        .rev()
        .find(|l| l.application_id == Some(application.id))
        .expect("`Lease` should be opened")
}

/// Creates a new [`Service`] backed by an empty [`Memory`].
pub(crate) fn service() -> Service<Memory> {
    Service {
        config: Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                b"secret",
            ),
            deliver_notifications: task::deliver_notifications::Config {
                interval: std::time::Duration::from_secs(5),
                batch_size: 100,
            },
            mark_overdue_rent_payments:
                task::mark_overdue_rent_payments::Config {
                    interval: std::time::Duration::from_secs(60 * 60),
                },
        },
        database: Memory::default(),
    }
}

/// Replaces the row matching the provided predicate, if any.
fn replace<T>(rows: &mut [T], row: T, matches: impl Fn(&T) -> bool) {
    if let Some(existing) = rows.iter_mut().find(|r| matches(r)) {
        *existing = row;
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let guard = Arc::clone(&self.serial).lock_owned().await;
        let staged = self.with(|s| s.clone());
        Ok(Memory {
            committed: Arc::clone(&self.committed),
            serial: Arc::clone(&self.serial),
            conn: Tx {
                staged: Arc::new(Mutex::new(staged)),
                _serial: Arc::new(guard),
            },
        })
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let staged = self.with(|s| s.clone());
        *NonTx.state(&self.committed) = staged;
        Ok(())
    }
}

impl<C: Connection> Database<Select<By<Option<User>, user::Id>>>
    for Memory<C>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.with(|s| s.users.iter().find(|u| u.id == id).cloned()))
    }
}

impl<C: Connection> Database<Insert<user::Association>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(association): Insert<user::Association>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            let exists = s.associations.iter().any(|a| {
                a.owner_id == association.owner_id
                    && a.tenant_id == association.tenant_id
            });
            if !exists {
                s.associations.push(association);
            }
        });
        Ok(())
    }
}

impl<C: Connection> Database<Select<By<Option<Property>, property::Id>>>
    for Memory<C>
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.with(|s| s.properties.iter().find(|p| p.id == id).cloned()))
    }
}

impl<C: Connection> Database<Update<Property>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(property): Update<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = property.id;
        self.with(|s| replace(&mut s.properties, property, |p| p.id == id));
        Ok(())
    }
}

impl<C> Database<Lock<By<Property, property::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl<C: Connection>
    Database<Select<By<Option<Application>, application::Id>>> for Memory<C>
{
    type Ok = Option<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Application>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .with(|s| s.applications.iter().find(|a| a.id == id).cloned()))
    }
}

impl<C: Connection> Database<Select<By<Vec<Application>, property::Id>>>
    for Memory<C>
{
    type Ok = Vec<Application>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Application>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let property_id = by.into_inner();
        Ok(self.with(|s| {
            s.applications
                .iter()
                .filter(|a| a.property_id == property_id)
                .cloned()
                .collect()
        }))
    }
}

impl<C: Connection> Database<Insert<Application>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(application): Insert<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| s.applications.push(application));
        Ok(())
    }
}

impl<C: Connection> Database<Update<Application>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(application): Update<Application>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = application.id;
        self.with(|s| replace(&mut s.applications, application, |a| a.id == id));
        Ok(())
    }
}

impl<C> Database<Lock<By<Application, application::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Application, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl<C: Connection> Database<Select<By<Option<Lease>, lease::Id>>>
    for Memory<C>
{
    type Ok = Option<Lease>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Lease>, lease::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.with(|s| s.leases.iter().find(|l| l.id == id).cloned()))
    }
}

impl<C: Connection> Database<Select<By<Option<Active<Lease>>, property::Id>>>
    for Memory<C>
{
    type Ok = Option<Active<Lease>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Active<Lease>>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let property_id = by.into_inner();
        Ok(self.with(|s| {
            s.leases
                .iter()
                .find(|l| l.property_id == property_id && l.is_active())
                .cloned()
                .map(Active)
        }))
    }
}

impl<C: Connection> Database<Select<By<Option<Lease>, application::Id>>>
    for Memory<C>
{
    type Ok = Option<Lease>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Lease>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let application_id = by.into_inner();
        Ok(self.with(|s| {
            s.leases
                .iter()
                .rev()
                .find(|l| l.application_id == Some(application_id))
                .cloned()
        }))
    }
}

impl<C: Connection> Database<Insert<Lease>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(lease): Insert<Lease>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| s.leases.push(lease));
        Ok(())
    }
}

impl<C: Connection> Database<Update<Lease>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(lease): Update<Lease>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = lease.id;
        self.with(|s| replace(&mut s.leases, lease, |l| l.id == id));
        Ok(())
    }
}

impl<C> Database<Lock<By<Lease, lease::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Lease, lease::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl<C: Connection>
    Database<Select<By<Option<RentPayment>, rent_payment::Id>>> for Memory<C>
{
    type Ok = Option<RentPayment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<RentPayment>, rent_payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .with(|s| s.rent_payments.iter().find(|p| p.id == id).cloned()))
    }
}

impl<C: Connection> Database<Select<By<Vec<RentPayment>, lease::Id>>>
    for Memory<C>
{
    type Ok = Vec<RentPayment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<RentPayment>, lease::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let lease_id = by.into_inner();
        let mut payments: Vec<_> = self.with(|s| {
            s.rent_payments
                .iter()
                .filter(|p| p.lease_id == lease_id)
                .cloned()
                .collect()
        });
        payments.sort_by_key(|p| p.installment_number);
        Ok(payments)
    }
}

impl<C: Connection> Database<Insert<Vec<RentPayment>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payments): Insert<Vec<RentPayment>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| s.rent_payments.extend(payments));
        Ok(())
    }
}

impl<C: Connection> Database<Update<RentPayment>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(payment): Update<RentPayment>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = payment.id;
        self.with(|s| replace(&mut s.rent_payments, payment, |p| p.id == id));
        Ok(())
    }
}

impl<C: Connection> Database<Delete<By<Vec<RentPayment>, lease::Id>>>
    for Memory<C>
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Vec<RentPayment>, lease::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let lease_id = by.into_inner();
        Ok(self.with(|s| {
            let before = s.rent_payments.len();
            s.rent_payments.retain(|p| p.lease_id != lease_id);
            u64::try_from(before - s.rent_payments.len()).unwrap_or(u64::MAX)
        }))
    }
}

impl<C: Connection> Database<Update<By<Overdue, Date>>> for Memory<C> {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<Overdue, Date>>,
    ) -> Result<Self::Ok, Self::Err> {
        let today = by.into_inner();
        let now = DateTime::now();
        Ok(self.with(|s| {
            let active: Vec<_> = s
                .leases
                .iter()
                .filter(|l| l.is_active())
                .map(|l| l.id)
                .collect();
            let mut marked = 0;
            for payment in &mut s.rent_payments {
                if active.contains(&payment.lease_id)
                    && payment.mark_overdue(today, now.coerce())
                {
                    marked += 1;
                }
            }
            marked
        }))
    }
}

impl<C: Connection> Database<Insert<Notification>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| s.notifications.push(notification));
        Ok(())
    }
}

impl<C: Connection> Database<Update<Notification>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(notification): Update<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = notification.id;
        self.with(|s| {
            replace(&mut s.notifications, notification, |n| n.id == id);
        });
        Ok(())
    }
}

impl<C: Connection> Database<Select<By<Vec<Notification>, Undelivered>>>
    for Memory<C>
{
    type Ok = Vec<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Notification>, Undelivered>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Undelivered { limit } = by.into_inner();
        Ok(self.with(|s| {
            s.notifications
                .iter()
                .filter(|n| !n.is_settled())
                .take(usize::from(limit))
                .cloned()
                .collect()
        }))
    }
}
