//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
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

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use common::operations::{By, Start};
use derive_more::{Debug, Error};

#[cfg(doc)]
use infra::{Database, Notifier};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key of the sessions issued by the authentication
    /// provider.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [`task::DeliverNotifications`] configuration.
    pub deliver_notifications: task::deliver_notifications::Config,

    /// [`task::MarkOverdueRentPayments`] configuration.
    pub mark_overdue_rent_payments: task::mark_overdue_rent_payments::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters, spawning its
    /// background [`Task`]s.
    ///
    /// Queued notifications are delivered with the provided [`Notifier`].
    pub fn new<N>(
        config: Config,
        database: Db,
        notifier: N,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::DeliverNotifications<Self, N>,
                        (task::deliver_notifications::Config, N),
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::MarkOverdueRentPayments<Self>,
                        task::mark_overdue_rent_payments::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
        N: 'static,
    {
        let this = Service { config, database };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("deliver_notifications", async move {
            let config = svc.config().deliver_notifications;
            svc.execute(Start(
                By::<task::DeliverNotifications<Self, N>, _>::new((
                    config, notifier,
                )),
            ))
            .await
        });
        let svc = this.clone();
        bg.spawn("mark_overdue_rent_payments", async move {
            let config = svc.config().mark_overdue_rent_payments;
            svc.execute(Start(
                By::<task::MarkOverdueRentPayments<Self>, _>::new(config),
            ))
            .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}
