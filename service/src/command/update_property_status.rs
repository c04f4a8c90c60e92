//! [`Command`] for overriding the status of a [`Property`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    DateTime,
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

/// [`Command`] for forcing a new [`Status`] of a [`Property`] on behalf of an
/// admin.
///
/// Leaving the [`Status::Occupied`] status ends the active [`Lease`] of the
/// [`Property`]: the [`Lease`] is terminated, its outstanding
/// [`RentPayment`]s are cancelled and the [`Application`] behind it is
/// cancelled, so its tenant may apply again.
///
/// [`Status`]: property::Status
/// [`Status::Occupied`]: property::Status::Occupied
#[derive(Clone, Copy, Debug)]
pub struct UpdatePropertyStatus {
    /// ID of the [`Property`] to update.
    pub property_id: property::Id,

    /// Admin overriding the [`Status`].
    ///
    /// [`Status`]: property::Status
    pub initiator: user::Initiator,

    /// New [`Status`] of the [`Property`].
    ///
    /// [`Status`]: property::Status
    pub status: property::Status,
}

impl<Db> Command<UpdatePropertyStatus> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
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
            Select<By<Option<Active<Lease>>, property::Id>>,
            Ok = Option<Active<Lease>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Lease>, lease::Id>>,
            Ok = Option<Lease>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<RentPayment>, lease::Id>>,
            Ok = Vec<RentPayment>,
            Err = Traced<database::Error>,
        > + Database<Update<Property>, Err = Traced<database::Error>>
        + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Update<Lease>, Err = Traced<database::Error>>
        + Database<Update<RentPayment>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Property;
    type Err = Traced<ExecutionError>;

    #[expect(clippy::too_many_lines, reason = "single override transaction")]
    async fn execute(
        &self,
        cmd: UpdatePropertyStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdatePropertyStatus {
            property_id,
            initiator,
            status,
        } = cmd;

        if !matches!(initiator.role, user::Role::Admin) {
            return Err(tracerr::new!(E::NotAdmin(initiator.id)));
        }

        drop(
            self.database()
                .execute(Select(By::<Option<Property>, _>::new(property_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::PropertyNotExists(property_id))
                .map_err(tracerr::wrap!())?,
        );

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Property`.
        tx.execute(Lock(By::<Property, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut property = tx
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;

        if matches!(status, property::Status::Occupied) {
            if property.is_occupied() {
                return Ok(property);
            }
            return Err(tracerr::new!(E::OccupiedWithoutLease(
                property::OccupiedWithoutLease(property_id)
            )));
        }

        let now = DateTime::now();

        let active = tx
            .execute(Select(By::<Option<Active<Lease>>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(Active(active)) = active {
            let lease_id = active.id;

            if let Some(application_id) = active.application_id {
                tx.execute(Lock(By::<Application, _>::new(application_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
            tx.execute(Lock(By::<Lease, _>::new(lease_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            let mut lease = tx
                .execute(Select(By::<Option<Lease>, _>::new(lease_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::LeaseNotExists(lease_id))
                .map_err(tracerr::wrap!())?;

            let reason = Reason::lease_ended(status);
            lease
                .terminate(
                    lease::Reason::new(String::from(reason.clone())),
                    None,
                    now.coerce(),
                )
                .map_err(tracerr::from_and_wrap!(=> E))?;
            tx.execute(Update(lease.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            let cancelled =
                lifecycle::cancel_outstanding_payments(&tx, lease_id, now)
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;

            if let Some(application_id) = lease.application_id {
                let application = tx
                    .execute(Select(By::<Option<Application>, _>::new(
                        application_id,
                    )))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                if let Some(mut application) = application.filter(|a| {
                    matches!(a.status(), application::Status::Approved)
                }) {
                    application
                        .supersede(reason.clone(), now.coerce())
                        .map_err(tracerr::from_and_wrap!(=> E))?;
                    tx.execute(Update(application.clone()))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))
                        .map(drop)?;
                    lifecycle::notify(
                        &tx,
                        [application.tenant_id],
                        Event::ApplicationStatusUpdated(
                            ApplicationStatusUpdated {
                                application_id,
                                property_id,
                                property_name: property.name.clone(),
                                status: application.status(),
                                reason: Some(reason.clone()),
                            },
                        ),
                    )
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                }
            }

            lifecycle::notify_about_lease(
                &tx,
                LeaseAction::Terminated,
                &lease,
                &property,
                Some(reason.to_string()),
            )
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

            log::info!(
                "`Lease(id: {lease_id})` ended by setting \
                 `Property(id: {property_id})` to `{status}`, \
                 {cancelled} outstanding payment(s) cancelled",
            );
        }

        property
            .release(status, now.coerce())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Update(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Property(id: {property_id})` is now `{status}`");

        Ok(property)
    }
}

/// Error of [`UpdatePropertyStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Lease`] is not active.
    #[display("{_0}")]
    #[from]
    LeaseNotActive(lease::NotActive),

    /// [`Lease`] with the provided ID does not exist.
    #[display("`Lease(id: {_0})` does not exist")]
    LeaseNotExists(#[error(not(source))] lease::Id),

    /// Initiator is not an admin.
    #[display("`User(id: {_0})` is not an admin")]
    NotAdmin(#[error(not(source))] user::Id),

    /// [`Property`] cannot be occupied without a [`Lease`].
    #[display("{_0}")]
    #[from]
    OccupiedWithoutLease(property::OccupiedWithoutLease),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`Application`] behind the [`Lease`] cannot be cancelled.
    #[display("{_0}")]
    #[from]
    Transition(application::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{UpdateLeaseContract, UpdateRentPaymentStatus},
        domain::{application, lease, property, rent_payment, user},
        infra::database::memory,
        Command as _,
    };

    use super::{ExecutionError as E, UpdatePropertyStatus};

    #[tokio::test]
    async fn ends_lease_when_taken_off_market() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let admin = db.user(user::Role::Admin);
        let lease = memory::leased(&svc, owner, "120000").await;
        let application_id = lease.application_id.unwrap();

        let updated = svc
            .execute(UpdatePropertyStatus {
                property_id: lease.property_id,
                initiator: admin,
                status: property::Status::UnderMaintenance,
            })
            .await
            .unwrap();

        assert_eq!(updated.status(), property::Status::UnderMaintenance);
        assert_eq!(updated.current_lease_id(), None);

        let state = db.snapshot();
        let ended = state.lease(lease.id);
        assert_eq!(ended.status(), lease::Status::Terminated);
        assert!(ended
            .termination
            .as_ref()
            .is_some_and(|t| t.reason.is_some()));
        let application = state.application(application_id);
        assert_eq!(application.status(), application::Status::Cancelled);
        assert_eq!(
            application.rejection_reason,
            Some(application::Reason::lease_ended(
                property::Status::UnderMaintenance,
            )),
        );
        assert_eq!(
            state.notified(lease.tenant_id).last(),
            Some(&"lease.notification"),
        );
    }

    #[tokio::test]
    async fn cancels_outstanding_payments_when_vacated() {
        use rent_payment::Status as S;

        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;
        _ = svc
            .execute(UpdateLeaseContract {
                lease_id: lease.id,
                initiator: owner,
                contract_url: None,
                cheque_count: Some(4),
                payment_method: None,
                first_due_date: None,
                ejari_number: None,
                ejari_status: None,
            })
            .await
            .unwrap();
        let (paid, overdue) = {
            let state = db.snapshot();
            let payments = state.payments_of(lease.id);
            (payments[0].id, payments[1].id)
        };
        _ = svc
            .execute(UpdateRentPaymentStatus {
                rent_payment_id: paid,
                initiator: owner,
                status: S::Paid,
            })
            .await
            .unwrap();
        db.seed(|s| {
            let p = s.rent_payments.iter_mut().find(|p| p.id == overdue);
            p.unwrap()
                .set_status(S::Overdue, DateTime::now().coerce())
                .unwrap();
        });

        let updated = svc
            .execute(UpdatePropertyStatus {
                property_id: lease.property_id,
                initiator: db.user(user::Role::Admin),
                status: property::Status::Vacant,
            })
            .await
            .unwrap();

        assert_eq!(updated.status(), property::Status::Vacant);
        let state = db.snapshot();
        assert_eq!(state.lease(lease.id).status(), lease::Status::Terminated);
        let statuses: Vec<_> = state
            .payments_of(lease.id)
            .into_iter()
            .map(|p| (p.id, p.status()))
            .collect();
        assert_eq!(statuses.len(), 4);
        for (id, status) in statuses {
            if id == paid {
                assert_eq!(status, S::Paid);
            } else {
                assert_eq!(status, S::Cancelled, "`RentPayment(id: {id})`");
            }
        }
    }

    #[tokio::test]
    async fn keeps_occupied_property_as_is() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;
        let queued = db.snapshot().notifications.len();

        let updated = svc
            .execute(UpdatePropertyStatus {
                property_id: lease.property_id,
                initiator: db.user(user::Role::Admin),
                status: property::Status::Occupied,
            })
            .await
            .unwrap();

        assert_eq!(updated.current_lease_id(), Some(lease.id));
        let state = db.snapshot();
        assert!(state.lease(lease.id).is_active());
        assert_eq!(state.notifications.len(), queued);
    }

    #[tokio::test]
    async fn refuses_occupying_without_lease() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");

        let err = svc
            .execute(UpdatePropertyStatus {
                property_id: property.id,
                initiator: db.user(user::Role::Admin),
                status: property::Status::Occupied,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::OccupiedWithoutLease(_)));
        assert!(!db.snapshot().property(property.id).is_occupied());
    }

    #[tokio::test]
    async fn only_admins_override() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");

        let err = svc
            .execute(UpdatePropertyStatus {
                property_id: property.id,
                initiator: owner,
                status: property::Status::Sold,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::NotAdmin(_)));
    }
}
