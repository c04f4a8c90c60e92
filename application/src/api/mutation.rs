//! GraphQL [`Mutation`]s definitions.

use common::{Date, Money};
use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Submits a new `Application` for the specified `Property` on behalf of
    /// the current tenant.
    ///
    /// Any previous `Application` of the tenant for the same `Property`
    /// which is already decided is superseded.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` does not exist;
    /// - `PROPERTY_OCCUPIED` - the `Property` is leased already;
    /// - `ACTIVE_APPLICATION_EXISTS` - the tenant has a pending or reviewed
    ///                                 `Application` for the `Property`;
    /// - `IDENTITY_DOCUMENTS_MISSING` - national ID or passport number is not
    ///                                  provided;
    /// - `NON_POSITIVE_AMOUNT` - the offer is zero or negative;
    /// - `NOT_TENANT` - the current `User` is not a tenant.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "submitApplication",
            move_in_date = ?move_in_date,
            offer_amount = ?offer_amount,
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    pub async fn submit_application(
        property_id: api::property::Id,
        full_name: api::user::Name,
        email: Option<api::user::Email>,
        phone: Option<api::user::Phone>,
        national_id: Option<api::application::DocumentNumber>,
        passport_number: Option<api::application::DocumentNumber>,
        message: Option<api::application::Message>,
        offer_amount: Option<Money>,
        move_in_date: Option<Date>,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let initiator = ctx.initiator().await?;

        ctx.service()
            .execute(command::SubmitApplication {
                property_id: property_id.into(),
                initiator,
                full_name: full_name.into(),
                email: email.map(Into::into),
                phone: phone.map(Into::into),
                national_id: national_id.map(Into::into),
                passport_number: passport_number.map(Into::into),
                message: message.map(Into::into),
                offer_amount,
                move_in_date,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Reviews the specified `Application`.
    ///
    /// Approving opens a `Lease` for it, occupies the `Property` and rejects
    /// all other open `Application`s for the `Property`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `APPLICATION_NOT_EXISTS` - the `Application` does not exist;
    /// - `PROPERTY_OCCUPIED` - the `Property` is leased by another `Lease`;
    /// - `INVALID_TRANSITION` - the `Application` cannot move into the
    ///                          provided status;
    /// - `STATUS_NOT_ALLOWED` - the provided status cannot be set by a review;
    /// - `INVALID_LEASE_PERIOD` - the `Lease` would not end after its start;
    /// - `NON_POSITIVE_AMOUNT` - the resulting rent is zero or negative;
    /// - `NOT_PROPERTY_MANAGER` - the current `User` is neither the owner of
    ///                            the `Property` nor an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = %application_id,
            gql.name = "updateApplicationStatus",
            otel.name = Self::SPAN_NAME,
            status = ?status,
        ),
    )]
    pub async fn update_application_status(
        application_id: api::application::Id,
        status: api::application::Status,
        rejection_reason: Option<api::application::Reason>,
        start_date: Option<Date>,
        end_date: Option<Date>,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let initiator = ctx.initiator().await?;

        ctx.service()
            .execute(command::UpdateApplicationStatus {
                application_id: application_id.into(),
                status: status.into(),
                initiator,
                rejection_reason: rejection_reason.map(Into::into),
                start_date,
                end_date,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Withdraws the specified `Application`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `APPLICATION_NOT_EXISTS` - the `Application` does not exist;
    /// - `APPLICATION_APPROVED` - the `Application` is approved, its `Lease`
    ///                            must be terminated instead;
    /// - `INVALID_TRANSITION` - the `Application` is decided already;
    /// - `NOT_APPLICANT` - the current `User` is neither the applicant nor an
    ///                     admin.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = %application_id,
            gql.name = "cancelApplication",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_application(
        application_id: api::application::Id,
        ctx: &Context,
    ) -> Result<api::Application, Error> {
        let initiator = ctx.initiator().await?;

        ctx.service()
            .execute(command::CancelApplication {
                application_id: application_id.into(),
                initiator,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Opens a `Lease` for the specified approved `Application` which has
    /// none yet.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `APPLICATION_NOT_EXISTS` - the `Application` does not exist;
    /// - `APPLICATION_NOT_APPROVED` - the `Application` is not approved;
    /// - `APPLICATION_LEASED` - the `Application` has a `Lease` already;
    /// - `PROPERTY_OCCUPIED` - the `Property` is leased by another `Lease`;
    /// - `INVALID_LEASE_PERIOD` - the `Lease` would not end after its start;
    /// - `NON_POSITIVE_AMOUNT` - the rent or deposit is zero or negative;
    /// - `NOT_PROPERTY_MANAGER` - the current `User` is neither the owner of
    ///                            the `Property` nor an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            application_id = %application_id,
            end_date = ?end_date,
            gql.name = "createLease",
            otel.name = Self::SPAN_NAME,
            start_date = ?start_date,
        ),
    )]
    pub async fn create_lease(
        application_id: api::application::Id,
        start_date: Option<Date>,
        end_date: Option<Date>,
        rent_amount: Option<Money>,
        security_deposit: Option<Money>,
        ctx: &Context,
    ) -> Result<api::Lease, Error> {
        let initiator = ctx.initiator().await?;

        ctx.service()
            .execute(command::CreateLease {
                application_id: application_id.into(),
                initiator,
                start_date,
                end_date,
                rent_amount,
                security_deposit,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Updates the contract details of the specified active `Lease`.
    ///
    /// Providing `chequeCount` regenerates the installment schedule.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LEASE_NOT_EXISTS` - the `Lease` does not exist;
    /// - `LEASE_NOT_ACTIVE` - the `Lease` is not active;
    /// - `UNSUPPORTED_CHEQUE_COUNT` - the cheque count is not one of 1, 2,
    ///                                4, 6 or 12;
    /// - `INVALID_SCHEDULE` - the schedule cannot be generated;
    /// - `NOT_PROPERTY_MANAGER` - the current `User` is neither the owner of
    ///                            the `Property` nor an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            cheque_count = ?cheque_count,
            gql.name = "updateLeaseContract",
            lease_id = %lease_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    pub async fn update_lease_contract(
        lease_id: api::lease::Id,
        contract_url: Option<api::lease::DocumentUrl>,
        cheque_count: Option<i32>,
        payment_method: Option<api::lease::PaymentMethod>,
        first_due_date: Option<Date>,
        ejari_number: Option<api::lease::EjariNumber>,
        ejari_status: Option<api::lease::EjariStatus>,
        ctx: &Context,
    ) -> Result<api::Lease, Error> {
        let initiator = ctx.initiator().await?;
        let cheque_count = cheque_count
            .map(u8::try_from)
            .transpose()
            .map_err(|_| ScheduleError::UnsupportedChequeCount.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::UpdateLeaseContract {
                lease_id: lease_id.into(),
                initiator,
                contract_url: contract_url.map(Into::into),
                cheque_count,
                payment_method: payment_method.map(Into::into),
                first_due_date,
                ejari_number: ejari_number.map(Into::into),
                ejari_status: ejari_status.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Terminates the specified active `Lease`, vacating its `Property` and
    /// cancelling its outstanding `RentPayment`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LEASE_NOT_EXISTS` - the `Lease` does not exist;
    /// - `LEASE_NOT_ACTIVE` - the `Lease` is not active;
    /// - `NOT_PROPERTY_MANAGER` - the current `User` is neither the owner of
    ///                            the `Property` nor an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "terminateLease",
            lease_id = %lease_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn terminate_lease(
        lease_id: api::lease::Id,
        reason: Option<api::lease::Reason>,
        move_out_inspection: Option<api::lease::Inspection>,
        ctx: &Context,
    ) -> Result<api::Lease, Error> {
        let initiator = ctx.initiator().await?;

        ctx.service()
            .execute(command::TerminateLease {
                lease_id: lease_id.into(),
                initiator,
                reason: reason.map(Into::into),
                move_out_inspection: move_out_inspection.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Renews the specified active `Lease`, returning its successor.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `LEASE_NOT_EXISTS` - the `Lease` does not exist;
    /// - `LEASE_NOT_ACTIVE` - the `Lease` is not active;
    /// - `INVALID_LEASE_PERIOD` - the new end date is not after the current
    ///                            one;
    /// - `NON_POSITIVE_AMOUNT` - the rent is zero or negative;
    /// - `NOT_PROPERTY_MANAGER` - the current `User` is neither the owner of
    ///                            the `Property` nor an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            end_date = %end_date,
            gql.name = "renewLease",
            lease_id = %lease_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn renew_lease(
        lease_id: api::lease::Id,
        end_date: Date,
        rent_amount: Option<Money>,
        ctx: &Context,
    ) -> Result<api::Lease, Error> {
        let initiator = ctx.initiator().await?;

        ctx.service()
            .execute(command::RenewLease {
                lease_id: lease_id.into(),
                initiator,
                end_date,
                rent_amount,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|output| output.lease.into())
    }

    /// Overrides the status of the specified `Property`.
    ///
    /// Leaving `OCCUPIED` terminates the active `Lease` of the `Property`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` does not exist;
    /// - `OCCUPIED_WITHOUT_LEASE` - `OCCUPIED` can only be set by a `Lease`;
    /// - `NOT_ADMIN` - the current `User` is not an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updatePropertyStatus",
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
            status = ?status,
        ),
    )]
    pub async fn update_property_status(
        property_id: api::property::Id,
        status: api::property::Status,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let initiator = ctx.initiator().await?;

        ctx.service()
            .execute(command::UpdatePropertyStatus {
                property_id: property_id.into(),
                initiator,
                status: status.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Records the payment state of the specified `RentPayment`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RENT_PAYMENT_NOT_EXISTS` - the `RentPayment` does not exist;
    /// - `INVALID_TRANSITION` - the `RentPayment` cannot move into the
    ///                          provided status;
    /// - `NOT_PROPERTY_MANAGER` - the current `User` is neither the owner of
    ///                            the `Property` nor an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateRentPaymentStatus",
            otel.name = Self::SPAN_NAME,
            rent_payment_id = %rent_payment_id,
            status = ?status,
        ),
    )]
    pub async fn update_rent_payment_status(
        rent_payment_id: api::rent_payment::Id,
        status: api::rent_payment::Status,
        ctx: &Context,
    ) -> Result<api::RentPayment, Error> {
        let initiator = ctx.initiator().await?;

        ctx.service()
            .execute(command::UpdateRentPaymentStatus {
                rent_payment_id: rent_payment_id.into(),
                initiator,
                status: status.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum ApplicationError {
        #[code = "ACTIVE_APPLICATION_EXISTS"]
        #[status = CONFLICT]
        #[message = "Tenant already has an open `Application` for the \
                     `Property`"]
        ActiveExists,

        #[code = "APPLICATION_APPROVED"]
        #[status = CONFLICT]
        #[message = "`Application` is approved, its `Lease` must be \
                     terminated instead"]
        Approved,

        #[code = "APPLICATION_LEASED"]
        #[status = CONFLICT]
        #[message = "`Application` has a `Lease` already"]
        Leased,

        #[code = "APPLICATION_NOT_APPROVED"]
        #[status = CONFLICT]
        #[message = "`Application` is not approved"]
        NotApproved,

        #[code = "APPLICATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Application` with the provided ID does not exist"]
        NotExists,

        #[code = "IDENTITY_DOCUMENTS_MISSING"]
        #[status = BAD_REQUEST]
        #[message = "Both national ID and passport number are required"]
        IdentityDocumentsMissing,

        #[code = "STATUS_NOT_ALLOWED"]
        #[status = BAD_REQUEST]
        #[message = "Provided status cannot be set by a review"]
        StatusNotAllowed,
    }
}

define_error! {
    enum LeaseError {
        #[code = "INVALID_LEASE_PERIOD"]
        #[status = BAD_REQUEST]
        #[message = "`Lease` must end after its start"]
        InvalidPeriod,

        #[code = "LEASE_NOT_ACTIVE"]
        #[status = CONFLICT]
        #[message = "`Lease` is not active"]
        NotActive,

        #[code = "LEASE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Lease` with the provided ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum PropertyError {
        #[code = "OCCUPIED_WITHOUT_LEASE"]
        #[status = BAD_REQUEST]
        #[message = "`Property` can be occupied only by a `Lease`"]
        OccupiedWithoutLease,

        #[code = "PROPERTY_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Property` with the provided ID does not exist"]
        NotExists,

        #[code = "PROPERTY_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "`Property` is leased already"]
        Occupied,
    }
}

define_error! {
    enum RentPaymentError {
        #[code = "RENT_PAYMENT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`RentPayment` with the provided ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum ScheduleError {
        #[code = "INVALID_SCHEDULE"]
        #[status = BAD_REQUEST]
        #[message = "Installment schedule cannot be generated"]
        Invalid,

        #[code = "UNSUPPORTED_CHEQUE_COUNT"]
        #[status = BAD_REQUEST]
        #[message = "Cheque count must be one of 1, 2, 4, 6 or 12"]
        UnsupportedChequeCount,
    }
}

define_error! {
    enum ValidationError {
        #[code = "INVALID_TRANSITION"]
        #[status = CONFLICT]
        #[message = "Status transition is not allowed"]
        InvalidTransition,

        #[code = "NON_POSITIVE_AMOUNT"]
        #[status = BAD_REQUEST]
        #[message = "Amount must be positive"]
        NonPositiveAmount,

        #[code = "DATE_OUT_OF_RANGE"]
        #[status = BAD_REQUEST]
        #[message = "Date is out of the supported range"]
        DateOverflow,
    }
}

impl AsError for command::submit_application::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::ActiveApplicationExists(_) => {
                ApplicationError::ActiveExists.into()
            }
            Self::Db(e) => return e.try_as_error(),
            Self::IdentityDocumentsMissing => {
                ApplicationError::IdentityDocumentsMissing.into()
            }
            Self::NonPositiveOffer(_) => {
                ValidationError::NonPositiveAmount.into()
            }
            Self::NotTenant(_) => api::PrivilegeError::Tenant.into(),
            Self::PropertyOccupied(_) => PropertyError::Occupied.into(),
            Self::PropertyNotExists(_) => PropertyError::NotExists.into(),
            Self::Transition(_) => ValidationError::InvalidTransition.into(),
        })
    }
}

impl AsError for command::update_application_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::ApplicationNotExists(_) => ApplicationError::NotExists.into(),
            Self::DateOverflow(_) => ValidationError::DateOverflow.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidPeriod(_) => LeaseError::InvalidPeriod.into(),
            Self::LeaseNotActive(_) => LeaseError::NotActive.into(),
            Self::NonPositiveRent(_) => {
                ValidationError::NonPositiveAmount.into()
            }
            Self::NotPropertyManager(_) => {
                api::PrivilegeError::PropertyManager.into()
            }
            Self::PropertyAlreadyOccupied(_) | Self::PropertyOccupied(_) => {
                PropertyError::Occupied.into()
            }
            Self::PropertyNotExists(_) => PropertyError::NotExists.into(),
            Self::StatusNotAllowed(_) => {
                ApplicationError::StatusNotAllowed.into()
            }
            Self::Transition(_) => ValidationError::InvalidTransition.into(),
        })
    }
}

impl AsError for command::cancel_application::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::ApplicationApproved(_) => ApplicationError::Approved.into(),
            Self::ApplicationNotExists(_) => ApplicationError::NotExists.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::NotApplicant(_) => api::PrivilegeError::Applicant.into(),
            Self::PropertyNotExists(_) => return None,
            Self::Transition(_) => ValidationError::InvalidTransition.into(),
        })
    }
}

impl AsError for command::create_lease::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::ActiveLeaseExists(_) | Self::PropertyAlreadyOccupied(_) => {
                PropertyError::Occupied.into()
            }
            Self::ApplicationLeased(_) => ApplicationError::Leased.into(),
            Self::ApplicationNotApproved(_) => {
                ApplicationError::NotApproved.into()
            }
            Self::ApplicationNotExists(_) => ApplicationError::NotExists.into(),
            Self::DateOverflow(_) => ValidationError::DateOverflow.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidPeriod(_) => LeaseError::InvalidPeriod.into(),
            Self::NonPositiveAmount(_) => {
                ValidationError::NonPositiveAmount.into()
            }
            Self::NotPropertyManager(_) => {
                api::PrivilegeError::PropertyManager.into()
            }
            Self::PropertyNotExists(_) => PropertyError::NotExists.into(),
        })
    }
}

impl AsError for command::update_lease_contract::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use service::domain::rent_payment::schedule;

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::LeaseNotActive(_) => LeaseError::NotActive.into(),
            Self::LeaseNotExists(_) => LeaseError::NotExists.into(),
            Self::NotPropertyManager(_) => {
                api::PrivilegeError::PropertyManager.into()
            }
            Self::PropertyNotExists(_) => return None,
            Self::Schedule(schedule::Error::UnsupportedChequeCount(_)) => {
                ScheduleError::UnsupportedChequeCount.into()
            }
            Self::Schedule(schedule::Error::NonPositiveRent(_)) => {
                ValidationError::NonPositiveAmount.into()
            }
            Self::Schedule(schedule::Error::DateOverflow) => {
                ScheduleError::Invalid.into()
            }
        })
    }
}

impl AsError for command::terminate_lease::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::LeaseNotActive(_) => LeaseError::NotActive.into(),
            Self::LeaseNotExists(_) => LeaseError::NotExists.into(),
            Self::NotPropertyManager(_) => {
                api::PrivilegeError::PropertyManager.into()
            }
            Self::PropertyNotExists(_) => return None,
        })
    }
}

impl AsError for command::renew_lease::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use service::domain::lease::RenewalError;

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::LeaseNotExists(_) => LeaseError::NotExists.into(),
            Self::NonPositiveRent(_) => {
                ValidationError::NonPositiveAmount.into()
            }
            Self::NotPropertyManager(_) => {
                api::PrivilegeError::PropertyManager.into()
            }
            Self::PropertyNotExists(_) => return None,
            Self::Renewal(RenewalError::NotActive(_)) => {
                LeaseError::NotActive.into()
            }
            Self::Renewal(RenewalError::InvalidPeriod(_)) => {
                LeaseError::InvalidPeriod.into()
            }
        })
    }
}

impl AsError for command::update_property_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::LeaseNotActive(_)
            | Self::LeaseNotExists(_)
            | Self::Transition(_) => return None,
            Self::NotAdmin(_) => api::PrivilegeError::Admin.into(),
            Self::OccupiedWithoutLease(_) => {
                PropertyError::OccupiedWithoutLease.into()
            }
            Self::PropertyNotExists(_) => PropertyError::NotExists.into(),
        })
    }
}

impl AsError for command::update_rent_payment_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::LeaseNotExists(_) => return None,
            Self::NotPropertyManager(_) => {
                api::PrivilegeError::PropertyManager.into()
            }
            Self::RentPaymentNotExists(_) => RentPaymentError::NotExists.into(),
            Self::Transition(_) => ValidationError::InvalidTransition.into(),
        })
    }
}
