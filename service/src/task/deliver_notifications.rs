//! [`DeliverNotifications`] [`Task`].

use std::{convert::Infallible, error::Error, fmt, time};

use common::{
    operations::{
        By, Commit, Deliver, Perform, Select, Start, Transact, Transacted,
        Update,
    },
    DateTime,
};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::Notification,
    infra::{database, Database, Notifier},
    read::notification::Undelivered,
    Service,
};

use super::Task;

/// Configuration for [`DeliverNotifications`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between delivery rounds.
    pub interval: time::Duration,

    /// Maximum number of [`Notification`]s delivered in a single round.
    pub batch_size: u16,
}

/// [`Task`] for delivering queued [`Notification`]s through a [`Notifier`].
///
/// Every [`Notification`] is attempted once: a failed delivery is recorded
/// and never retried.
#[derive(Clone, Copy, Debug)]
pub struct DeliverNotifications<S, N> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,

    /// [`Notifier`] to deliver [`Notification`]s with.
    notifier: N,
}

impl<Db, N> Task<Start<By<DeliverNotifications<Self, N>, (Config, N)>>>
    for Service<Db>
where
    DeliverNotifications<Service<Db>, N>:
        Task<Perform<()>, Ok = usize, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<DeliverNotifications<Self, N>, (Config, N)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (config, notifier) = by.into_inner();
        let task = DeliverNotifications {
            config,
            service: self.clone(),
            notifier,
        };

        let mut interval = tokio::time::interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::DeliverNotifications` failed: {e}");
            });
        }
    }
}

impl<Db, N> Task<Perform<()>> for DeliverNotifications<Service<Db>, N>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Vec<Notification>, Undelivered>>,
            Ok = Vec<Notification>,
            Err = Traced<database::Error>,
        > + Database<Update<Notification>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    N: Notifier<Deliver<Notification>, Err: fmt::Display>,
{
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let tx = self
            .service
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::wrap!())?;

        let batch = tx
            .execute(Select(By::<Vec<Notification>, _>::new(Undelivered {
                limit: self.config.batch_size,
            })))
            .await
            .map_err(tracerr::wrap!())?;

        let mut delivered = 0;
        for mut notification in batch {
            let id = notification.id;
            let name = notification.event.name();
            match self.notifier.execute(Deliver(notification.clone())).await {
                Ok(_) => {
                    notification.delivered_at = Some(DateTime::now().coerce());
                    delivered += 1;
                }
                Err(e) => {
                    log::error!(
                        "failed to deliver `{name}` `Notification(id: {id})`: \
                         {e}",
                    );
                    notification.failed_at = Some(DateTime::now().coerce());
                    notification.failure = Some(e.to_string());
                }
            }
            tx.execute(Update(notification))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        if delivered > 0 {
            log::debug!("{delivered} notification(s) delivered");
        }

        Ok(delivered)
    }
}

/// Error of [`DeliverNotifications`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::{Deliver, Perform};

    use crate::{
        domain::{user, Notification},
        infra::{database::memory, Notifier},
    };

    use super::{Config, DeliverNotifications};

    /// [`Notifier`] refusing lease [`Notification`]s.
    #[derive(Clone, Copy, Debug)]
    struct NoLeases;

    impl Notifier<Deliver<Notification>> for NoLeases {
        type Ok = ();
        type Err = &'static str;

        async fn execute(
            &self,
            Deliver(notification): Deliver<Notification>,
        ) -> Result<Self::Ok, Self::Err> {
            match notification.event.name() {
                "lease.notification" => Err("gateway unavailable"),
                _ => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn settles_each_notification_once() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        _ = memory::leased(&svc, owner, "120000").await;
        // Submission, status update, and lease creation for both parties.
        assert_eq!(db.snapshot().notifications.len(), 4);
        let task = DeliverNotifications {
            config: Config {
                interval: Duration::from_secs(5),
                batch_size: 3,
            },
            service: svc.clone(),
            notifier: NoLeases,
        };

        assert_eq!(task.execute(Perform(())).await.unwrap(), 2);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        let state = db.snapshot();
        assert!(state.notifications.iter().all(Notification::is_settled));
        let failed: Vec<_> = state
            .notifications
            .iter()
            .filter(|n| n.failed_at.is_some())
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|n| {
            n.event.name() == "lease.notification"
                && n.delivered_at.is_none()
                && n.failure.as_deref() == Some("gateway unavailable")
        }));
    }
}
