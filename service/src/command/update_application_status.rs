//! [`Command`] for reviewing an [`Application`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    Date, DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        application::{self, Reason},
        lease,
        notification::{ApplicationStatusUpdated, Event, LeaseAction},
        property, user, Application, Lease, Notification, Property,
        RentPayment,
    },
    infra::{database, Database},
    read::lease::Active,
    Service,
};

use super::{lifecycle, Command};

/// [`Command`] for moving an [`Application`] into a new [`Status`] on behalf
/// of the [`Property`] owner or an admin.
///
/// Approving an [`Application`] opens a [`Lease`] for it and occupies the
/// [`Property`]. Every other active [`Application`] for the [`Property`] is
/// rejected, and every other approved one is superseded.
///
/// [`Status`]: application::Status
#[derive(Clone, Debug)]
pub struct UpdateApplicationStatus {
    /// ID of the [`Application`] to review.
    pub application_id: application::Id,

    /// New [`Status`] of the [`Application`].
    ///
    /// [`Status`]: application::Status
    pub status: application::Status,

    /// Owner or admin reviewing the [`Application`].
    pub initiator: user::Initiator,

    /// [`Reason`] of the rejection, if any.
    pub rejection_reason: Option<Reason>,

    /// Start [`Date`] of the [`Lease`] to open on approval, overriding the
    /// requested move-in date.
    pub start_date: Option<Date>,

    /// End [`Date`] of the [`Lease`] to open on approval, overriding the
    /// default one-year term.
    pub end_date: Option<Date>,
}

impl<Db> Command<UpdateApplicationStatus> for Service<Db>
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
        > + Database<Lock<By<Lease, lease::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Application>, application::Id>>,
            Ok = Option<Application>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Application>, property::Id>>,
            Ok = Vec<Application>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Active<Lease>>, property::Id>>,
            Ok = Option<Active<Lease>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<RentPayment>, lease::Id>>,
            Ok = Vec<RentPayment>,
            Err = Traced<database::Error>,
        > + Database<Update<Property>, Err = Traced<database::Error>>
        + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Insert<Lease>, Err = Traced<database::Error>>
        + Database<Update<Lease>, Err = Traced<database::Error>>
        + Database<Update<RentPayment>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    #[expect(clippy::too_many_lines, reason = "single approval transaction")]
    async fn execute(
        &self,
        cmd: UpdateApplicationStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use application::Status as S;
        use ExecutionError as E;

        let UpdateApplicationStatus {
            application_id,
            status,
            initiator,
            rejection_reason,
            start_date,
            end_date,
        } = cmd;

        if matches!(status, S::Cancelled) {
            return Err(tracerr::new!(E::StatusNotAllowed(status)));
        }

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

        // Avoid concurrent approvals upon the same `Property`.
        tx.execute(Lock(By::<Property, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        // Avoid concurrent actions upon the same `Application`.
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
        let mut application = tx
            .execute(Select(By::<Option<Application>, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotExists(application_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();

        if matches!(status, S::Approved) && property.is_occupied() {
            return Err(tracerr::new!(E::PropertyOccupied(property_id)));
        }
        application
            .review(status, initiator.id, rejection_reason, now.coerce())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Update(application.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        lifecycle::notify(
            &tx,
            [application.tenant_id],
            Event::ApplicationStatusUpdated(ApplicationStatusUpdated {
                application_id,
                property_id,
                property_name: property.name.clone(),
                status,
                reason: application.rejection_reason.clone(),
            }),
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if matches!(status, S::Approved) {
            // Non-occupied `Property` may still refer to a stale `Lease`.
            let stale = tx
                .execute(Select(By::<Option<Active<Lease>>, _>::new(
                    property_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if let Some(Active(stale)) = stale {
                tx.execute(Lock(By::<Lease, _>::new(stale.id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;

                let mut stale = stale;
                stale
                    .terminate(None, None, now.coerce())
                    .map_err(tracerr::from_and_wrap!(=> E))?;
                _ = lifecycle::cancel_outstanding_payments(&tx, stale.id, now)
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                log::warn!(
                    "stale `Lease(id: {})` of `Property(id: {property_id})` \
                     is terminated on approval",
                    stale.id,
                );
                tx.execute(Update(stale))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
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
            let rent = application.offer_amount.unwrap_or(property.price);
            if !rent.is_positive() {
                return Err(tracerr::new!(E::NonPositiveRent(rent)));
            }

            let lease = Lease::open(
                &property,
                application.tenant_id,
                Some(application_id),
                (start, end),
                rent,
                rent,
            )
            .map_err(tracerr::from_and_wrap!(=> E))?;
            tx.execute(Insert(lease.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            property
                .occupy(lease.id, now.coerce())
                .map_err(tracerr::from_and_wrap!(=> E))?;
            tx.execute(Update(property.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            let siblings = tx
                .execute(Select(By::<Vec<Application>, _>::new(property_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .into_iter()
                .filter(|a| a.id != application_id);
            for mut sibling in siblings {
                if sibling.is_active() {
                    sibling
                        .reject_as_outbid(initiator.id, now.coerce())
                        .map_err(tracerr::from_and_wrap!(=> E))?;
                } else if matches!(sibling.status(), S::Approved) {
                    // Its `Lease` has ended, or was terminated above as stale.
                    sibling
                        .supersede(
                            Reason::superseded_by_new_application(),
                            now.coerce(),
                        )
                        .map_err(tracerr::from_and_wrap!(=> E))?;
                    log::info!(
                        "`Application(id: {})` is superseded by \
                         `Application(id: {application_id})`",
                        sibling.id,
                    );
                } else {
                    continue;
                }
                tx.execute(Update(sibling.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                lifecycle::notify(
                    &tx,
                    [sibling.tenant_id],
                    Event::ApplicationStatusUpdated(ApplicationStatusUpdated {
                        application_id: sibling.id,
                        property_id,
                        property_name: property.name.clone(),
                        status: sibling.status(),
                        reason: sibling.rejection_reason.clone(),
                    }),
                )
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }

            lifecycle::notify_about_lease(
                &tx,
                LeaseAction::Created,
                &lease,
                &property,
                None,
            )
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

            log::info!(
                "`Application(id: {application_id})` approved, \
                 `Lease(id: {})` opened",
                lease.id,
            );
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Application(id: {application_id})` is now `{status}`");

        Ok(application)
    }
}

/// Error of [`UpdateApplicationStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Application`] with the provided ID does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    ApplicationNotExists(#[error(not(source))] application::Id),

    /// Lease end date cannot be computed.
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

    /// Stale [`Lease`] cannot be terminated.
    #[display("{_0}")]
    #[from]
    LeaseNotActive(lease::NotActive),

    /// Rent of the [`Lease`] to open is zero or negative.
    #[display("Rent amount must be positive, got `{_0}`")]
    NonPositiveRent(#[error(not(source))] Money),

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

    /// [`Property`] is occupied, so no [`Application`] can be approved.
    #[display("`Property(id: {_0})` is already leased")]
    PropertyOccupied(#[error(not(source))] property::Id),

    /// [`Status`] cannot be set by a review.
    ///
    /// [`Status`]: application::Status
    #[display("`{_0}` status cannot be set by a review")]
    StatusNotAllowed(#[error(not(source))] application::Status),

    /// [`Application`] cannot move into the requested [`Status`].
    ///
    /// [`Status`]: application::Status
    #[display("{_0}")]
    #[from]
    Transition(application::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::{
        command::{SubmitApplication, TerminateLease},
        domain::{application, lease, property, user},
        infra::database::memory::{self, submission},
        Command as _,
    };

    use super::{ExecutionError as E, UpdateApplicationStatus};

    fn approve(
        application_id: application::Id,
        initiator: user::Initiator,
    ) -> UpdateApplicationStatus {
        UpdateApplicationStatus {
            application_id,
            status: application::Status::Approved,
            initiator,
            rejection_reason: None,
            start_date: None,
            end_date: None,
        }
    }

    #[tokio::test]
    async fn approval_opens_lease_and_rejects_siblings() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let (alice, bob) =
            (db.user(user::Role::Tenant), db.user(user::Role::Tenant));
        let property = db.property(owner.id, "120000");

        let first = svc.execute(submission(property.id, alice)).await.unwrap();
        let second = svc.execute(submission(property.id, bob)).await.unwrap();

        let approved = svc.execute(approve(first.id, owner)).await.unwrap();
        assert_eq!(approved.status(), application::Status::Approved);
        assert_eq!(approved.reviewed_by, Some(owner.id));

        let state = db.snapshot();
        assert_eq!(state.leases.len(), 1);
        let lease = &state.leases[0];
        assert!(lease.is_active());
        assert_eq!(lease.application_id, Some(first.id));
        assert_eq!(lease.tenant_id, alice.id);
        assert_eq!(lease.owner_id, owner.id);
        assert_eq!(lease.rent_amount, property.price);
        assert_eq!(lease.security_deposit, property.price);

        let property = state.property(property.id);
        assert_eq!(property.status(), property::Status::Occupied);
        assert_eq!(property.current_lease_id(), Some(lease.id));

        let sibling = state.application(second.id);
        assert_eq!(sibling.status(), application::Status::Rejected);
        assert_eq!(
            sibling.rejection_reason,
            Some(application::Reason::lease_awarded_to_another_tenant()),
        );

        assert_eq!(
            state.notified(alice.id),
            ["application.statusUpdated", "lease.notification"],
        );
        assert_eq!(state.notified(bob.id), ["application.statusUpdated"]);
        assert_eq!(
            state.notified(owner.id),
            [
                "application.submitted",
                "application.submitted",
                "lease.notification",
            ],
        );
    }

    #[tokio::test]
    async fn concurrent_approvals_open_single_lease() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "90000");
        let first = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();
        let second = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            svc.execute(approve(first.id, owner)),
            svc.execute(approve(second.id, owner)),
        );

        assert!(a.is_ok());
        assert!(matches!(b.unwrap_err().into_inner(), E::PropertyOccupied(_)));

        let state = db.snapshot();
        assert_eq!(state.leases.iter().filter(|l| l.is_active()).count(), 1);
        assert_eq!(
            state.application(first.id).status(),
            application::Status::Approved,
        );
        assert_eq!(
            state.application(second.id).status(),
            application::Status::Rejected,
        );
    }

    #[tokio::test]
    async fn failed_approval_changes_nothing() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let tenant = db.user(user::Role::Tenant);
        let property = db.property(owner.id, "0");
        let application =
            svc.execute(submission(property.id, tenant)).await.unwrap();

        let err = svc
            .execute(approve(application.id, owner))
            .await
            .unwrap_err();
        assert!(matches!(err.into_inner(), E::NonPositiveRent(_)));

        let state = db.snapshot();
        assert_eq!(
            state.application(application.id).status(),
            application::Status::Pending,
        );
        assert!(state.leases.is_empty());
        assert!(!state.property(property.id).is_occupied());
        assert!(state.notified(tenant.id).is_empty());
    }

    #[tokio::test]
    async fn offer_overrides_property_price() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");
        let application = svc
            .execute(SubmitApplication {
                offer_amount: Some("110000".parse().unwrap()),
                ..submission(property.id, db.user(user::Role::Tenant))
            })
            .await
            .unwrap();

        _ = svc.execute(approve(application.id, owner)).await.unwrap();

        let state = db.snapshot();
        assert_eq!(
            state.leases[0].rent_amount,
            "110000".parse::<Money>().unwrap(),
        );
    }

    #[tokio::test]
    async fn terminates_stale_lease_on_approval() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");
        let first = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();
        _ = svc.execute(approve(first.id, owner)).await.unwrap();
        // Break the occupancy behind the back of the lifecycle.
        db.seed(|s| {
            let p = s.properties.iter_mut().find(|p| p.id == property.id);
            p.unwrap().vacate(DateTime::now().coerce());
        });
        let stale = db.snapshot().leases[0].id;

        let second = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();
        _ = svc.execute(approve(second.id, owner)).await.unwrap();

        let state = db.snapshot();
        assert_eq!(state.lease(stale).status(), lease::Status::Terminated);
        let active: Vec<_> =
            state.leases.iter().filter(|l| l.is_active()).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].application_id, Some(second.id));
        assert_eq!(
            state.property(property.id).current_lease_id(),
            Some(active[0].id),
        );
    }

    #[tokio::test]
    async fn supersedes_approved_application_of_ended_lease() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let old = memory::leased(&svc, owner, "120000").await;
        _ = svc
            .execute(TerminateLease {
                lease_id: old.id,
                initiator: owner,
                reason: None,
                move_out_inspection: None,
            })
            .await
            .unwrap();
        let previous = old.application_id.unwrap();

        let tenant = db.user(user::Role::Tenant);
        let next = svc
            .execute(submission(old.property_id, tenant))
            .await
            .unwrap();
        _ = svc.execute(approve(next.id, owner)).await.unwrap();

        let state = db.snapshot();
        let approved: Vec<_> = state
            .applications
            .iter()
            .filter(|a| a.property_id == old.property_id)
            .filter(|a| matches!(a.status(), application::Status::Approved))
            .map(|a| a.id)
            .collect();
        assert_eq!(approved, [next.id]);

        let previous = state.application(previous);
        assert_eq!(previous.status(), application::Status::Cancelled);
        assert_eq!(
            previous.rejection_reason,
            Some(application::Reason::superseded_by_new_application()),
        );
        assert_eq!(
            state.notified(previous.tenant_id).last().copied(),
            Some("application.statusUpdated"),
        );
    }

    #[tokio::test]
    async fn only_managers_review() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let stranger = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");
        let application = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();

        let err = svc
            .execute(approve(application.id, stranger))
            .await
            .unwrap_err();
        assert!(matches!(err.into_inner(), E::NotPropertyManager(_)));

        let admin = db.user(user::Role::Admin);
        let reviewed = svc
            .execute(UpdateApplicationStatus {
                status: application::Status::UnderReview,
                ..approve(application.id, admin)
            })
            .await
            .unwrap();
        assert_eq!(reviewed.status(), application::Status::UnderReview);
    }

    #[tokio::test]
    async fn refuses_cancellation_by_review() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");
        let application = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();

        let err = svc
            .execute(UpdateApplicationStatus {
                status: application::Status::Cancelled,
                ..approve(application.id, owner)
            })
            .await
            .unwrap_err();
        assert!(matches!(err.into_inner(), E::StatusNotAllowed(_)));
    }
}
