//! Schema migrations of the [`Postgres`] database.

use async_trait::async_trait;
use refinery::Runner;
use refinery_core::{
    traits::r#async::{AsyncQuery, AsyncTransaction},
    AsyncMigrate, Migration,
};
use tracerr::Traced;

use crate::infra::{database, postgres};

use super::{connection, Postgres};

impl Postgres {
    /// Applies the pending migrations of the provided [`Runner`] and returns
    /// how many of them were applied.
    ///
    /// # Errors
    ///
    /// If any migration fails. Migrations applied before the failed one stay
    /// applied.
    pub async fn migrate(
        &mut self,
        runner: Runner,
    ) -> Result<usize, Traced<database::Error>> {
        let report = runner
            .run_async(self)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;
        let applied = report.applied_migrations();
        for m in applied {
            tracing::info!(migration = %m, "schema migration applied");
        }
        if applied.is_empty() {
            tracing::debug!("schema is up to date");
        }
        Ok(applied.len())
    }

    /// Takes a [`connection::NonTx`] from the pool for the migration driver.
    async fn migration_connection(
        &self,
    ) -> Result<connection::NonTx, Traced<database::Error>> {
        self.0
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncTransaction for Postgres {
    type Error = Traced<database::Error>;

    async fn execute(
        &mut self,
        queries: &[&str],
    ) -> Result<usize, Self::Error> {
        let mut conn = self.migration_connection().await?;
        AsyncTransaction::execute(&mut **conn, queries)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncQuery<Vec<Migration>> for Postgres {
    async fn query(
        &mut self,
        query: &str,
    ) -> Result<Vec<Migration>, <Self as AsyncTransaction>::Error> {
        let mut conn = self.migration_connection().await?;
        AsyncQuery::query(&mut **conn, query)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl AsyncMigrate for Postgres {}
