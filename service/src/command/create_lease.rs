//! [`Command`] for creating a [`Lease`] of an approved [`Application`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    Date, DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        application, lease, notification::LeaseAction, property, user,
        Application, Lease, Notification, Property,
    },
    infra::{database, Database},
    read::lease::Active,
    Service,
};

use super::{lifecycle, Command};

/// [`Command`] for creating a [`Lease`] of an already approved
/// [`Application`] which has none yet.
#[derive(Clone, Copy, Debug)]
pub struct CreateLease {
    /// ID of the approved [`Application`].
    pub application_id: application::Id,

    /// Owner or admin creating the [`Lease`].
    pub initiator: user::Initiator,

    /// Start [`Date`] of the [`Lease`].
    ///
    /// Defaults to the requested move-in date, or today.
    pub start_date: Option<Date>,

    /// End [`Date`] of the [`Lease`].
    ///
    /// Defaults to one year after the start.
    pub end_date: Option<Date>,

    /// Yearly rent of the [`Lease`].
    ///
    /// Defaults to the offer of the [`Application`], or the [`Property`]
    /// price.
    pub rent_amount: Option<Money>,

    /// Security deposit of the [`Lease`].
    ///
    /// Defaults to the rent.
    pub security_deposit: Option<Money>,
}

impl<Db> Command<CreateLease> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Application>, application::Id>>,
            Ok = Option<Application>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Application, application::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Application>, application::Id>>,
            Ok = Option<Application>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Active<Lease>>, property::Id>>,
            Ok = Option<Active<Lease>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Lease>, application::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        > + Database<Update<Property>, Err = Traced<database::Error>>
        + Database<Insert<Lease>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Lease;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateLease) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateLease {
            application_id,
            initiator,
            start_date,
            end_date,
            rent_amount,
            security_deposit,
        } = cmd;

        let application = self
            .database()
            .execute(Select(By::<Option<Application>, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotExists(application_id))
            .map_err(tracerr::wrap!())?;
        let property_id = application.property_id;

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if !property.is_managed_by(initiator) {
            return Err(tracerr::new!(E::NotPropertyManager(initiator.id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent leases upon the same `Property`.
        tx.execute(Lock(By::<Property, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Application, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut property = tx
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        let application = tx
            .execute(Select(By::<Option<Application>, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotExists(application_id))
            .map_err(tracerr::wrap!())?;

        if !matches!(application.status(), application::Status::Approved) {
            return Err(tracerr::new!(E::ApplicationNotApproved(
                application_id
            )));
        }
        if let Some(Active(active)) = tx
            .execute(Select(By::<Option<Active<Lease>>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            return Err(tracerr::new!(E::ActiveLeaseExists(active.id)));
        }
        if let Some(existing) = tx
            .execute(Select(By::<Option<Lease>, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            return Err(tracerr::new!(E::ApplicationLeased(existing.id)));
        }

        let start = start_date
            .or(application.move_in_date)
            .unwrap_or_else(Date::today);
        let end = match end_date {
            Some(end) => end,
            None => start
                .checked_add_years(1)
                .ok_or(E::DateOverflow(start))
                .map_err(tracerr::wrap!())?,
        };
        let rent = rent_amount
            .or(application.offer_amount)
            .unwrap_or(property.price);
        if !rent.is_positive() {
            return Err(tracerr::new!(E::NonPositiveAmount(rent)));
        }
        let deposit = security_deposit.unwrap_or(rent);
        if deposit < Money::ZERO {
            return Err(tracerr::new!(E::NonPositiveAmount(deposit)));
        }

        let lease = Lease::open(
            &property,
            application.tenant_id,
            Some(application_id),
            (start, end),
            rent,
            deposit,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Insert(lease.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        property
            .occupy(lease.id, DateTime::now().coerce())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Update(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        lifecycle::notify_about_lease(
            &tx,
            LeaseAction::Created,
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
            "`Lease(id: {})` created for `Application(id: {application_id})`",
            lease.id,
        );

        Ok(lease)
    }
}

/// Error of [`CreateLease`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Property`] already has an active [`Lease`].
    #[display("`Property` is already leased by `Lease(id: {_0})`")]
    ActiveLeaseExists(#[error(not(source))] lease::Id),

    /// [`Application`] already has a [`Lease`].
    #[display("`Application` already has `Lease(id: {_0})`")]
    ApplicationLeased(#[error(not(source))] lease::Id),

    /// [`Application`] is not approved.
    #[display("`Application(id: {_0})` is not approved")]
    ApplicationNotApproved(#[error(not(source))] application::Id),

    /// [`Application`] with the provided ID does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    ApplicationNotExists(#[error(not(source))] application::Id),

    /// [`Lease`] end date cannot be computed.
    #[display("Cannot compute the end date of a lease starting at `{_0}`")]
    DateOverflow(#[error(not(source))] Date),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Lease`] dates are invalid.
    #[display("{_0}")]
    #[from]
    InvalidPeriod(lease::InvalidPeriod),

    /// Rent or deposit amount is out of range.
    #[display("Invalid lease amount `{_0}`")]
    NonPositiveAmount(#[error(not(source))] Money),

    /// Initiator manages neither the [`Property`] nor the platform.
    #[display("`User(id: {_0})` is not allowed to manage this property")]
    NotPropertyManager(#[error(not(source))] user::Id),

    /// [`Property`] is occupied by another [`Lease`].
    #[display("{_0}")]
    #[from]
    PropertyAlreadyOccupied(property::AlreadyOccupied),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),
}

#[cfg(test)]
mod spec {
    use common::{Date, DateTime, Money};

    use crate::{
        domain::{application, user, Application},
        infra::database::memory::{self, submission, Memory},
        Command as _, Service,
    };

    use super::{CreateLease, ExecutionError as E};

    /// Submits an [`Application`] and approves it bypassing the lease
    /// opening.
    async fn approved(
        svc: &Service<Memory>,
        owner: user::Initiator,
    ) -> Application {
        let db = svc.database();
        let property = db.property(owner.id, "120000");
        let application = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();
        db.seed(|s| {
            let a = s.applications.iter_mut().find(|a| a.id == application.id);
            a.unwrap()
                .review(
                    application::Status::Approved,
                    owner.id,
                    None,
                    DateTime::now().coerce(),
                )
                .unwrap();
        });
        db.snapshot().application(application.id).clone()
    }

    fn create(
        application_id: application::Id,
        initiator: user::Initiator,
    ) -> CreateLease {
        CreateLease {
            application_id,
            initiator,
            start_date: Some(Date::from_ymd(2025, 3, 1).unwrap()),
            end_date: None,
            rent_amount: None,
            security_deposit: Some("5000".parse().unwrap()),
        }
    }

    #[tokio::test]
    async fn opens_lease_for_approved_application() {
        let svc = memory::service();
        let owner = svc.database().user(user::Role::Owner);
        let application = approved(&svc, owner).await;

        let lease = svc.execute(create(application.id, owner)).await.unwrap();

        assert!(lease.is_active());
        assert_eq!(lease.start_date, Date::from_ymd(2025, 3, 1).unwrap());
        assert_eq!(lease.end_date, Date::from_ymd(2026, 3, 1).unwrap());
        assert_eq!(lease.rent_amount, "120000".parse::<Money>().unwrap());
        assert_eq!(lease.security_deposit, "5000".parse::<Money>().unwrap());
        let state = svc.database().snapshot();
        assert_eq!(
            state.property(application.property_id).current_lease_id(),
            Some(lease.id),
        );
        assert_eq!(
            state.notified(application.tenant_id),
            ["lease.notification"],
        );
    }

    #[tokio::test]
    async fn refuses_second_lease_of_application() {
        let svc = memory::service();
        let owner = svc.database().user(user::Role::Owner);
        let application = approved(&svc, owner).await;
        let first = svc.execute(create(application.id, owner)).await.unwrap();

        let err = svc
            .execute(create(application.id, owner))
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            E::ActiveLeaseExists(id) if id == first.id,
        ));
    }

    #[tokio::test]
    async fn refuses_pending_application() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");
        let application = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();

        let err = svc
            .execute(create(application.id, owner))
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::ApplicationNotApproved(_)));
        assert!(db.snapshot().leases.is_empty());
    }

    #[tokio::test]
    async fn refuses_invalid_period() {
        let svc = memory::service();
        let owner = svc.database().user(user::Role::Owner);
        let application = approved(&svc, owner).await;

        let err = svc
            .execute(CreateLease {
                end_date: Some(Date::from_ymd(2025, 3, 1).unwrap()),
                ..create(application.id, owner)
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::InvalidPeriod(_)));
    }
}
