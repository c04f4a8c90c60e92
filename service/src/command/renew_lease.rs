//! [`Command`] for renewing a [`Lease`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    Date, DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        lease, notification::LeaseAction, property, user, Lease, Notification,
        Property,
    },
    infra::{database, Database},
    Service,
};

use super::{lifecycle, Command};

/// [`Command`] for renewing an active [`Lease`], replacing it with a
/// successor starting at its end.
///
/// Installments of the successor are not scheduled until its contract is
/// updated.
#[derive(Clone, Copy, Debug)]
pub struct RenewLease {
    /// ID of the [`Lease`] to renew.
    pub lease_id: lease::Id,

    /// Owner or admin renewing the [`Lease`].
    pub initiator: user::Initiator,

    /// End [`Date`] of the successor [`Lease`].
    pub end_date: Date,

    /// Yearly rent of the successor [`Lease`], if changed.
    pub rent_amount: Option<Money>,
}

/// Output of [`RenewLease`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Renewed [`Lease`].
    pub previous: Lease,

    /// Successor [`Lease`].
    pub lease: Lease,
}

impl<Db> Command<RenewLease> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Lease>, lease::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Lease, lease::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Lease>, lease::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        > + Database<Update<Property>, Err = Traced<database::Error>>
        + Database<Insert<Lease>, Err = Traced<database::Error>>
        + Database<Update<Lease>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RenewLease) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RenewLease {
            lease_id,
            initiator,
            end_date,
            rent_amount,
        } = cmd;

        if let Some(rent) = rent_amount.filter(|r| !r.is_positive()) {
            return Err(tracerr::new!(E::NonPositiveRent(rent)));
        }

        let lease = self
            .database()
            .execute(Select(By::<Option<Lease>, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LeaseNotExists(lease_id))
            .map_err(tracerr::wrap!())?;
        if !lease.is_managed_by(initiator) {
            return Err(tracerr::new!(E::NotPropertyManager(initiator.id)));
        }
        let property_id = lease.property_id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Property, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        // Avoid concurrent renewals of the same `Lease`.
        tx.execute(Lock(By::<Lease, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut property = tx
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        let mut previous = tx
            .execute(Select(By::<Option<Lease>, _>::new(lease_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LeaseNotExists(lease_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let lease = previous
            .renew(end_date, rent_amount, now.coerce())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(previous.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(lease.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        property.hand_over(lease.id, now.coerce());
        tx.execute(Update(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        lifecycle::notify_about_lease(
            &tx,
            LeaseAction::Renewed,
            &lease,
            &property,
            None,
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Lease(id: {lease_id})` renewed by `Lease(id: {})`",
            lease.id,
        );

        Ok(Output { previous, lease })
    }
}

/// Error of [`RenewLease`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Lease`] with the provided ID does not exist.
    #[display("`Lease(id: {_0})` does not exist")]
    LeaseNotExists(#[error(not(source))] lease::Id),

    /// New rent is zero or negative.
    #[display("Rent amount must be positive, got `{_0}`")]
    NonPositiveRent(#[error(not(source))] Money),

    /// Initiator manages neither the [`Property`] nor the platform.
    #[display("`User(id: {_0})` is not allowed to manage this lease")]
    NotPropertyManager(#[error(not(source))] user::Id),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`Lease`] cannot be renewed.
    #[display("{_0}")]
    #[from]
    Renewal(lease::RenewalError),
}

#[cfg(test)]
mod spec {
    use common::{Date, Money};

    use crate::{
        domain::{lease, user},
        infra::database::memory,
        query, Command as _,
    };

    use super::{ExecutionError as E, RenewLease};

    #[tokio::test]
    async fn hands_property_over_to_successor() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;

        let out = svc
            .execute(RenewLease {
                lease_id: lease.id,
                initiator: owner,
                end_date: Date::from_ymd(2027, 1, 1).unwrap(),
                rent_amount: Some("125000".parse().unwrap()),
            })
            .await
            .unwrap();

        assert_eq!(out.previous.status(), lease::Status::Renewed);
        assert!(out.lease.is_active());
        assert_eq!(out.lease.previous_lease_id, Some(lease.id));
        assert_eq!(out.lease.application_id, lease.application_id);
        assert_eq!(out.lease.start_date, lease.end_date);
        assert_eq!(out.lease.rent_amount, "125000".parse::<Money>().unwrap());
        assert_eq!(out.lease.security_deposit, lease.security_deposit);

        let state = db.snapshot();
        let property = state.property(lease.property_id);
        assert!(property.is_occupied());
        assert_eq!(property.current_lease_id(), Some(out.lease.id));
        assert_eq!(
            state.leases.iter().filter(|l| l.is_active()).count(),
            1,
        );
    }

    #[tokio::test]
    async fn application_refers_to_latest_lease() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;
        let application_id = lease.application_id.unwrap();

        let out = svc
            .execute(RenewLease {
                lease_id: lease.id,
                initiator: owner,
                end_date: Date::from_ymd(2027, 1, 1).unwrap(),
                rent_amount: None,
            })
            .await
            .unwrap();

        let latest = svc
            .execute(query::lease::OfApplication::by(application_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, out.lease.id);
        assert_eq!(latest.previous_lease_id, Some(lease.id));
    }

    #[tokio::test]
    async fn refuses_end_before_current_one() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;

        let err = svc
            .execute(RenewLease {
                lease_id: lease.id,
                initiator: owner,
                end_date: lease.end_date,
                rent_amount: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::Renewal(_)));
        assert!(db.snapshot().lease(lease.id).is_active());
    }

    #[tokio::test]
    async fn refuses_renewed_lease() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;
        let renew = RenewLease {
            lease_id: lease.id,
            initiator: owner,
            end_date: Date::from_ymd(2027, 1, 1).unwrap(),
            rent_amount: None,
        };
        _ = svc.execute(renew).await.unwrap();

        let err = svc.execute(renew).await.unwrap_err();

        assert!(matches!(err.into_inner(), E::Renewal(_)));
    }

    #[tokio::test]
    async fn tenants_cannot_renew() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;

        let err = svc
            .execute(RenewLease {
                lease_id: lease.id,
                initiator: user::Initiator {
                    id: lease.tenant_id,
                    role: user::Role::Tenant,
                },
                end_date: Date::from_ymd(2027, 1, 1).unwrap(),
                rent_amount: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::NotPropertyManager(_)));
    }
}
