//! [`MarkOverdueRentPayments`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Perform, Start, Update},
    Date,
};
use tracerr::Traced;
use tracing as log;

use crate::{
    infra::{database, Database},
    read::rent_payment::Overdue,
    Service,
};
#[cfg(doc)]
use crate::domain::RentPayment;

use super::Task;

/// Configuration for [`MarkOverdueRentPayments`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between [`RentPayment`]s checks.
    pub interval: time::Duration,
}

/// [`Task`] for marking outstanding [`RentPayment`]s of active leases as
/// overdue once their due date passes.
#[derive(Clone, Copy, Debug)]
pub struct MarkOverdueRentPayments<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<MarkOverdueRentPayments<Self>, Config>>> for Service<Db>
where
    MarkOverdueRentPayments<Service<Db>>:
        Task<Perform<()>, Ok = u64, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<MarkOverdueRentPayments<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = MarkOverdueRentPayments {
            config,
            service: self.clone(),
        };

        let mut interval = tokio::time::interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::MarkOverdueRentPayments` failed: {e}");
            });
        }
    }
}

impl<Db> Task<Perform<()>> for MarkOverdueRentPayments<Service<Db>>
where
    Db: Database<
        Update<By<Overdue, Date>>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
{
    type Ok = u64;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let today = Date::today();
        let marked = self
            .service
            .database()
            .execute(Update(By::<Overdue, _>::new(today)))
            .await
            .map_err(tracerr::wrap!())?;
        if marked > 0 {
            log::info!("{marked} rent payment(s) due before {today} are overdue");
        }
        Ok(marked)
    }
}

/// Error of [`MarkOverdueRentPayments`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::Perform;

    use crate::{
        command::{
            TerminateLease, UpdateLeaseContract, UpdateRentPaymentStatus,
        },
        domain::{lease, rent_payment, user},
        infra::database::memory::{self, Memory},
        Service,
    };

    use super::{Config, MarkOverdueRentPayments, Task as _};

    fn task(
        svc: &Service<Memory>,
    ) -> MarkOverdueRentPayments<Service<Memory>> {
        MarkOverdueRentPayments {
            config: Config {
                interval: Duration::from_secs(60),
            },
            service: svc.clone(),
        }
    }

    async fn monthly(
        svc: &Service<Memory>,
        owner: user::Initiator,
    ) -> lease::Id {
        let lease = memory::leased(svc, owner, "120000").await;
        _ = svc
            .execute(UpdateLeaseContract {
                lease_id: lease.id,
                initiator: owner,
                contract_url: None,
                cheque_count: Some(12),
                payment_method: None,
                first_due_date: None,
                ejari_number: None,
                ejari_status: None,
            })
            .await
            .unwrap();
        lease.id
    }

    #[tokio::test]
    async fn marks_unsettled_past_due_payments() {
        use rent_payment::Status as S;

        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease_id = monthly(&svc, owner).await;
        let ids: Vec<_> = db
            .snapshot()
            .payments_of(lease_id)
            .iter()
            .map(|p| p.id)
            .collect();
        for (id, status) in [(ids[0], S::Paid), (ids[1], S::Partial)] {
            _ = svc
                .execute(UpdateRentPaymentStatus {
                    rent_payment_id: id,
                    initiator: owner,
                    status,
                })
                .await
                .unwrap();
        }

        let marked = task(&svc).execute(Perform(())).await.unwrap();

        assert_eq!(marked, 11);
        let state = db.snapshot();
        let payments = state.payments_of(lease_id);
        assert_eq!(payments[0].status(), S::Paid);
        assert!(payments[1..].iter().all(|p| p.status() == S::Overdue));

        let marked = task(&svc).execute(Perform(())).await.unwrap();
        assert_eq!(marked, 0);
    }

    #[tokio::test]
    async fn skips_ended_leases() {
        let svc = memory::service();
        let db = svc.database();
        let owner = db.user(user::Role::Owner);
        let lease_id = monthly(&svc, owner).await;
        _ = svc
            .execute(TerminateLease {
                lease_id,
                initiator: owner,
                reason: None,
                move_out_inspection: None,
            })
            .await
            .unwrap();

        let marked = task(&svc).execute(Perform(())).await.unwrap();

        assert_eq!(marked, 0);
        assert!(db
            .snapshot()
            .payments_of(lease_id)
            .iter()
            .all(|p| p.status() == rent_payment::Status::Cancelled));
    }
}
