//! [`Connection`] definitions.

use std::{fmt, future::Future};

use deadpool_postgres::GenericClient;
use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio_postgres::{types::ToSql, Row};
use tracerr::Traced;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    Client as NonTx, CreatePoolError as PoolCreationError, Pool, PoolError,
};
pub use tokio_postgres::Error;

/// Parameters of a SQL statement.
pub type Params<'a> = &'a [&'a (dyn ToSql + Sync)];

/// Transactional Postgres database [`Connection`].
///
/// Dropping a [`Tx`] without committing it rolls the transaction back.
#[self_referencing]
pub struct Tx {
    /// [`NonTx`] [`Connection`] the transaction was started from.
    non_tx: NonTx,

    /// Transaction started in the [`Connection`].
    #[borrows(mut non_tx)]
    #[not_covariant]
    tx: Option<deadpool_postgres::Transaction<'this>>,
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("committed", &self.with_tx(|tx| tx.is_none()))
            .finish_non_exhaustive()
    }
}

impl Tx {
    /// Starts a new [`Tx`] on the provided [`NonTx`] [`Connection`].
    ///
    /// # Errors
    ///
    /// If failed to start a transaction on the provided [`NonTx`].
    pub async fn begin(client: NonTx) -> Result<Self, Traced<database::Error>> {
        tracing::trace!("BEGIN");
        Self::try_new_async_send(client, |c| c.transaction().map_ok(Some).boxed())
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Returns the underlying [`Transaction`] of this [`Tx`] connection.
    ///
    /// [`Transaction`]: deadpool_postgres::Transaction
    fn tx(&self) -> &deadpool_postgres::Transaction<'_> {
        self.with_tx(|tx| tx.as_ref().expect("already committed"))
    }

    /// Commits this [`Tx`].
    ///
    /// # Errors
    ///
    /// If failed to commit this [`Tx`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    pub async fn commit(mut self) -> Result<(), Traced<database::Error>> {
        tracing::trace!("COMMIT");
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "different variance, see \
                      https://doc.rust-lang.org/nomicon/subtyping.html#variance"
        )]
        self.with_tx_mut(|tx| tx.take())
            .expect("already committed")
            .commit()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

/// Generic database connection.
pub trait Connection {
    /// Queries the provided SQL statement with the given parameters and
    /// returns the resulting rows.
    ///
    /// # Errors
    ///
    /// If failed to query the statement.
    fn query(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>;

    /// Queries the provided SQL statement with the given parameters and
    /// returns the optional resulting row.
    ///
    /// # Errors
    ///
    /// If failed to query the statement, or it returned more than one row.
    fn query_opt(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>;

    /// Executes the provided SQL statement with the given parameters and
    /// returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// If failed to execute the statement.
    fn exec(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>;

    /// Executes the provided batch of SQL statements.
    ///
    /// # Errors
    ///
    /// If failed to execute the batch.
    fn batch_exec(
        &self,
        sql: &str,
    ) -> impl Future<Output = Result<(), Traced<database::Error>>>;
}

/// Runs [`Connection::query()`] on the provided [`GenericClient`].
async fn query<C: GenericClient + Sync>(
    client: &C,
    sql: &str,
    params: Params<'_>,
) -> Result<Vec<Row>, Traced<database::Error>> {
    tracing::trace!(sql, "query");
    client
        .query(sql, params)
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Runs [`Connection::query_opt()`] on the provided [`GenericClient`].
async fn query_opt<C: GenericClient + Sync>(
    client: &C,
    sql: &str,
    params: Params<'_>,
) -> Result<Option<Row>, Traced<database::Error>> {
    tracing::trace!(sql, "query_opt");
    client
        .query_opt(sql, params)
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Runs [`Connection::exec()`] on the provided [`GenericClient`].
async fn exec<C: GenericClient + Sync>(
    client: &C,
    sql: &str,
    params: Params<'_>,
) -> Result<u64, Traced<database::Error>> {
    tracing::trace!(sql, "exec");
    client
        .execute(sql, params)
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Runs [`Connection::batch_exec()`] on the provided [`GenericClient`].
async fn batch_exec<C: GenericClient + Sync>(
    client: &C,
    sql: &str,
) -> Result<(), Traced<database::Error>> {
    client
        .batch_execute(sql)
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

impl Connection for NonTx {
    async fn query(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<Vec<Row>, Traced<database::Error>> {
        query(self, sql, params).await
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<Option<Row>, Traced<database::Error>> {
        query_opt(self, sql, params).await
    }

    async fn exec(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<u64, Traced<database::Error>> {
        exec(self, sql, params).await
    }

    async fn batch_exec(&self, sql: &str) -> Result<(), Traced<database::Error>> {
        batch_exec(self, sql).await
    }
}

impl Connection for Tx {
    async fn query(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<Vec<Row>, Traced<database::Error>> {
        query(self.tx(), sql, params).await
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<Option<Row>, Traced<database::Error>> {
        query_opt(self.tx(), sql, params).await
    }

    async fn exec(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<u64, Traced<database::Error>> {
        exec(self.tx(), sql, params).await
    }

    async fn batch_exec(&self, sql: &str) -> Result<(), Traced<database::Error>> {
        batch_exec(self.tx(), sql).await
    }
}
