//! [`Command`] for cancelling an [`Application`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        application,
        notification::{ApplicationStatusUpdated, Event},
        property, user, Application, Notification, Property,
    },
    infra::{database, Database},
    Service,
};

use super::{lifecycle, Command};

/// [`Command`] for cancelling an [`Application`] on behalf of its tenant or
/// an admin.
#[derive(Clone, Copy, Debug)]
pub struct CancelApplication {
    /// ID of the [`Application`] to cancel.
    pub application_id: application::Id,

    /// Tenant or admin cancelling the [`Application`].
    pub initiator: user::Initiator,
}

impl<Db> Command<CancelApplication> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Application>, application::Id>>,
            Ok = Option<Application>,
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
        > + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelApplication,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelApplication {
            application_id,
            initiator,
        } = cmd;

        let application = self
            .database()
            .execute(Select(By::<Option<Application>, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotExists(application_id))
            .map_err(tracerr::wrap!())?;
        let allowed = match initiator.role {
            user::Role::Admin => true,
            user::Role::Tenant => application.tenant_id == initiator.id,
            user::Role::Owner => false,
        };
        if !allowed {
            return Err(tracerr::new!(E::NotApplicant(initiator.id)));
        }
        let property_id = application.property_id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid racing with an approval upon the same `Property`.
        tx.execute(Lock(By::<Property, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Application, _>::new(application_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let property = tx
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

        if matches!(application.status(), application::Status::Approved) {
            return Err(tracerr::new!(E::ApplicationApproved(application_id)));
        }
        application
            .withdraw(DateTime::now().coerce())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        tx.execute(Update(application.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        lifecycle::notify(
            &tx,
            [property.owner_id],
            Event::ApplicationStatusUpdated(ApplicationStatusUpdated {
                application_id,
                property_id,
                property_name: property.name,
                status: application.status(),
                reason: None,
            }),
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Application(id: {application_id})` cancelled");

        Ok(application)
    }
}

/// Error of [`CancelApplication`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Application`] is approved and must be ended via its lease.
    #[display(
        "`Application(id: {_0})` is approved, terminate its lease instead"
    )]
    ApplicationApproved(#[error(not(source))] application::Id),

    /// [`Application`] with the provided ID does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    ApplicationNotExists(#[error(not(source))] application::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Initiator is neither the applicant nor an admin.
    #[display("`User(id: {_0})` is not allowed to cancel this application")]
    NotApplicant(#[error(not(source))] user::Id),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`Application`] cannot be cancelled.
    #[display("{_0}")]
    #[from]
    Transition(application::TransitionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{application, user},
        infra::database::memory::{self, submission},
        Command as _,
    };

    use super::{CancelApplication, ExecutionError as E};

    #[tokio::test]
    async fn tenant_withdraws_own_application() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let tenant = db.user(user::Role::Tenant);
        let property = db.property(owner.id, "120000");
        let application =
            svc.execute(submission(property.id, tenant)).await.unwrap();

        let cancelled = svc
            .execute(CancelApplication {
                application_id: application.id,
                initiator: tenant,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status(), application::Status::Cancelled);
        assert_eq!(
            db.snapshot().notified(owner.id),
            ["application.submitted", "application.statusUpdated"],
        );
    }

    #[tokio::test]
    async fn refuses_foreign_application() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");
        let application = svc
            .execute(submission(property.id, db.user(user::Role::Tenant)))
            .await
            .unwrap();

        for initiator in [db.user(user::Role::Tenant), owner] {
            let err = svc
                .execute(CancelApplication {
                    application_id: application.id,
                    initiator,
                })
                .await
                .unwrap_err();
            assert!(matches!(err.into_inner(), E::NotApplicant(_)));
        }
    }

    #[tokio::test]
    async fn refuses_approved_application() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;

        let err = svc
            .execute(CancelApplication {
                application_id: lease.application_id.unwrap(),
                initiator: db.user(user::Role::Admin),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::ApplicationApproved(_)));
        assert!(db.snapshot().lease(lease.id).is_active());
    }
}
