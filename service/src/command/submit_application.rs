//! [`Command`] for submitting a new [`Application`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    Date, DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        application::{self, Applicant, DocumentNumber, Message, Reason},
        notification::{ApplicationSubmitted, Event},
        property, user, Application, Notification, Property,
    },
    infra::{database, Database},
    Service,
};

use super::{lifecycle, Command};

/// [`Command`] for submitting a new [`Application`] on behalf of a tenant.
#[derive(Clone, Debug)]
pub struct SubmitApplication {
    /// ID of the [`Property`] to apply for.
    pub property_id: property::Id,

    /// Tenant submitting the [`Application`].
    pub initiator: user::Initiator,

    /// Full name of the applicant.
    pub full_name: user::Name,

    /// Contact email of the applicant.
    pub email: Option<user::Email>,

    /// Contact phone of the applicant.
    pub phone: Option<user::Phone>,

    /// National ID of the applicant.
    pub national_id: Option<DocumentNumber>,

    /// Passport number of the applicant.
    pub passport_number: Option<DocumentNumber>,

    /// Message to the [`Property`] owner.
    pub message: Option<Message>,

    /// Offered yearly rent.
    pub offer_amount: Option<Money>,

    /// Desired move-in [`Date`].
    pub move_in_date: Option<Date>,
}

impl<Db> Command<SubmitApplication> for Service<Db>
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
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Application>, property::Id>>,
            Ok = Vec<Application>,
            Err = Traced<database::Error>,
        > + Database<Insert<Application>, Err = Traced<database::Error>>
        + Database<Update<Application>, Err = Traced<database::Error>>
        + Database<Insert<user::Association>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SubmitApplication,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitApplication {
            property_id,
            initiator,
            full_name,
            email,
            phone,
            national_id,
            passport_number,
            message,
            offer_amount,
            move_in_date,
        } = cmd;

        if !matches!(initiator.role, user::Role::Tenant) {
            return Err(tracerr::new!(E::NotTenant(initiator.id)));
        }
        let (Some(national_id), Some(passport_number)) =
            (national_id, passport_number)
        else {
            return Err(tracerr::new!(E::IdentityDocumentsMissing));
        };
        if let Some(offer) = offer_amount.filter(|o| !o.is_positive()) {
            return Err(tracerr::new!(E::NonPositiveOffer(offer)));
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

        let property = tx
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if property.is_occupied() {
            return Err(tracerr::new!(E::PropertyOccupied(property_id)));
        }

        let previous = tx
            .execute(Select(By::<Vec<Application>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .filter(|a| a.tenant_id == initiator.id)
            .collect::<Vec<_>>();
        if let Some(active) = previous.iter().find(|a| a.is_active()) {
            return Err(tracerr::new!(E::ActiveApplicationExists(active.id)));
        }

        let now = DateTime::now();

        // Re-application after a lease ended.
        for mut approved in previous
            .into_iter()
            .filter(|a| matches!(a.status(), application::Status::Approved))
        {
            approved
                .supersede(Reason::superseded_by_new_application(), now.coerce())
                .map_err(tracerr::from_and_wrap!(=> E))?;
            log::info!(
                "`Application(id: {})` is superseded by a new one",
                approved.id,
            );
            tx.execute(Update(approved))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        let application = Application::new(
            property_id,
            initiator.id,
            Applicant {
                full_name,
                email,
                phone,
                national_id,
                passport_number,
                message,
            },
            offer_amount,
            move_in_date,
        );
        tx.execute(Insert(application.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Insert(user::Association {
            owner_id: property.owner_id,
            tenant_id: initiator.id,
            created_at: now.coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        lifecycle::notify(
            &tx,
            [property.owner_id],
            Event::ApplicationSubmitted(ApplicationSubmitted {
                application_id: application.id,
                property_id,
                property_name: property.name.clone(),
                offer_amount,
                move_in_date,
            }),
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Application(id: {})` submitted for `Property(id: {property_id})`",
            application.id,
        );

        Ok(application)
    }
}

/// Error of [`SubmitApplication`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Tenant already has an active [`Application`] for the [`Property`].
    #[display("`Application(id: {_0})` is already pending for this property")]
    ActiveApplicationExists(#[error(not(source))] application::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// National ID or passport number is not provided.
    #[display("Both national ID and passport number are required")]
    IdentityDocumentsMissing,

    /// Offered rent is zero or negative.
    #[display("Offer amount must be positive, got `{_0}`")]
    NonPositiveOffer(#[error(not(source))] Money),

    /// Initiator is not a tenant.
    #[display("`User(id: {_0})` is not a tenant")]
    NotTenant(#[error(not(source))] user::Id),

    /// [`Property`] is occupied.
    #[display("Property is already leased and not accepting new applications")]
    PropertyOccupied(#[error(not(source))] property::Id),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`Application`] cannot be superseded.
    #[display("Failed to supersede `Application`: {_0}")]
    #[from]
    Transition(application::TransitionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{TerminateLease, UpdateApplicationStatus},
        domain::{application, user},
        infra::database::memory::{self, submission},
        Command as _,
    };

    use super::{ExecutionError as E, SubmitApplication};

    #[tokio::test]
    async fn queues_application_for_owner() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let tenant = db.user(user::Role::Tenant);
        let property = db.property(owner.id, "120000");

        let application =
            svc.execute(submission(property.id, tenant)).await.unwrap();

        assert_eq!(application.status(), application::Status::Pending);
        assert_eq!(application.tenant_id, tenant.id);
        let state = db.snapshot();
        assert_eq!(state.applications.len(), 1);
        assert_eq!(state.notified(owner.id), ["application.submitted"]);
        assert!(state.notified(tenant.id).is_empty());
        assert_eq!(state.associations.len(), 1);
        assert_eq!(state.associations[0].owner_id, owner.id);
        assert_eq!(state.associations[0].tenant_id, tenant.id);
    }

    #[tokio::test]
    async fn requires_both_identity_documents() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");

        let err = svc
            .execute(SubmitApplication {
                passport_number: None,
                ..submission(property.id, db.user(user::Role::Tenant))
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::IdentityDocumentsMissing));
        assert!(db.snapshot().applications.is_empty());
    }

    #[tokio::test]
    async fn only_tenants_apply() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");

        let err = svc
            .execute(submission(property.id, owner))
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::NotTenant(_)));
    }

    #[tokio::test]
    async fn refuses_non_positive_offer() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");

        let err = svc
            .execute(SubmitApplication {
                offer_amount: Some("0".parse().unwrap()),
                ..submission(property.id, db.user(user::Role::Tenant))
            })
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::NonPositiveOffer(_)));
    }

    #[tokio::test]
    async fn refuses_second_active_application() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let tenant = db.user(user::Role::Tenant);
        let property = db.property(owner.id, "120000");
        let first = svc.execute(submission(property.id, tenant)).await.unwrap();

        let err = svc
            .execute(submission(property.id, tenant))
            .await
            .unwrap_err();

        assert!(matches!(
            err.into_inner(),
            E::ActiveApplicationExists(id) if id == first.id,
        ));
        assert_eq!(db.snapshot().applications.len(), 1);
    }

    #[tokio::test]
    async fn refuses_occupied_property() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease = memory::leased(&svc, owner, "120000").await;

        let err = svc
            .execute(submission(
                lease.property_id,
                db.user(user::Role::Tenant),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err.into_inner(), E::PropertyOccupied(_)));
    }

    #[tokio::test]
    async fn reapplication_supersedes_approved_one() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let property = db.property(owner.id, "120000");
        let tenant = db.user(user::Role::Tenant);
        let first = svc.execute(submission(property.id, tenant)).await.unwrap();
        _ = svc
            .execute(UpdateApplicationStatus {
                application_id: first.id,
                status: application::Status::Approved,
                initiator: owner,
                rejection_reason: None,
                start_date: None,
                end_date: None,
            })
            .await
            .unwrap();
        let lease = db.snapshot().leases[0].clone();
        _ = svc
            .execute(TerminateLease {
                lease_id: lease.id,
                initiator: owner,
                reason: None,
                move_out_inspection: None,
            })
            .await
            .unwrap();

        let second =
            svc.execute(submission(property.id, tenant)).await.unwrap();

        let state = db.snapshot();
        let first = state.application(first.id);
        assert_eq!(first.status(), application::Status::Cancelled);
        assert_eq!(
            first.rejection_reason,
            Some(application::Reason::superseded_by_new_application()),
        );
        assert_eq!(
            state.application(second.id).status(),
            application::Status::Pending,
        );
    }
}
