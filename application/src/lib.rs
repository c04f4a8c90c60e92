//! GraphQL API of the tenancy lifecycle [`Service`]: applications, leases,
//! rent payments and property occupancy.

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
mod context;
pub mod error;

use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    Extension, Json,
};
use derive_more::Debug;
use juniper::{http::GraphQLBatchResponse, DefaultScalarValue, ScalarValue};
use juniper_axum::extract::JuniperRequest;
// Used in binary.
use axum_client_ip as _;
use refinery as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    config::Config,
    context::Context,
    error::{AsError, Error},
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service = service::Service<service::infra::Postgres>;

/// [`juniper`] GraphQL response along with the HTTP status to send it with.
#[derive(Debug)]
pub struct JuniperResponse<S = DefaultScalarValue>
where
    S: ScalarValue,
{
    /// Status code of the response.
    pub status_code: http::StatusCode,

    /// Underlying GraphQL response.
    #[debug(skip)]
    pub response: GraphQLBatchResponse<S>,
}

impl<S> IntoResponse for JuniperResponse<S>
where
    S: ScalarValue,
{
    fn into_response(self) -> Response {
        let Self {
            status_code,
            response,
        } = self;

        let status_code = if response.is_ok() {
            http::StatusCode::OK
        } else {
            status_code
        };
        (status_code, Json(response)).into_response()
    }
}

/// Executes a GraphQL request against the [`api::Schema`].
///
/// A failed request is answered with the status code of the [`Error`] its
/// last failing resolver reported.
pub async fn graphql(
    Extension(schema): Extension<Arc<api::Schema>>,
    context: Context,
    JuniperRequest(gql_request): JuniperRequest,
) -> JuniperResponse {
    let response = gql_request.execute(&*schema, &context).await;
    if !response.is_ok() {
        tracing::debug!(
            status = %context.error_status_code(),
            "GraphQL request failed",
        );
    }
    JuniperResponse {
        status_code: context.error_status_code(),
        response,
    }
}
