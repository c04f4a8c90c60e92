//! GraphQL API definitions.

pub mod application;
pub mod lease;
mod mutation;
pub mod property;
mod query;
pub mod rent_payment;
pub mod scalar;
pub mod user;

use crate::{define_error, Context};

pub use self::{
    application::Application,
    lease::Lease,
    mutation::Mutation,
    property::Property,
    query::Query,
    rent_payment::RentPayment,
    user::User,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<
    'static,
    Query,
    Mutation,
    juniper::EmptySubscription<Context>,
>;

define_error! {
    enum PrivilegeError {
        #[code = "NOT_ADMIN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be an admin"]
        Admin,

        #[code = "NOT_LEASE_PARTICIPANT"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be the tenant or a manager of \
                     the `Lease`"]
        LeaseParticipant,

        #[code = "NOT_PROPERTY_MANAGER"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be the owner of the `Property` \
                     or an admin"]
        PropertyManager,

        #[code = "NOT_TENANT"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be a tenant"]
        Tenant,

        #[code = "NOT_APPLICANT"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be the applicant or an admin"]
        Applicant,
    }
}
