//! Postgres database client definitions.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{
        self,
        connection::{self, Params},
        Connection,
    },
};

/// Non-transactional Postgres database client.
///
/// Acquires a pooled [`connection::NonTx`] lazily, on the first use, and
/// keeps it until the client is dropped or the connection is handed over to
/// a [`Tx`].
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to acquire connections from.
    pub(crate) pool: connection::Pool,

    /// Connection used for non-transactional operations, if acquired.
    connection: Arc<RwLock<Option<connection::NonTx>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client from the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Acquires a new [`connection::NonTx`] from the [`connection::Pool`].
    async fn acquire(
        pool: &connection::Pool,
    ) -> Result<connection::NonTx, Traced<database::Error>> {
        pool.get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Returns the underlying [`Connection`] of this [`NonTx`] client,
    /// acquiring it if none yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        let read = self.connection.read().await;
        let guard = if read.is_some() {
            read
        } else {
            drop(read);

            let mut write = self.connection.write().await;
            if write.is_none() {
                *write = Some(
                    Self::acquire(&self.pool).await.map_err(tracerr::wrap!())?,
                );
            }
            write.downgrade()
        };

        Ok(RwLockReadGuard::map(guard, |conn| {
            conn.as_ref()
                .expect("connection cannot be dropped while guard is alive")
        }))
    }

    /// Takes the already acquired [`Connection`] out of this [`NonTx`]
    /// client, if any.
    async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

impl Connection for NonTx {
    async fn query(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<Vec<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<Option<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<u64, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn batch_exec(&self, sql: &str) -> Result<(), Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .batch_exec(sql)
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Transactional Postgres database client.
///
/// The transaction is started lazily, on the first statement, reusing the
/// connection of the [`NonTx`] client it was created from, if any. All the
/// clones share the same transaction.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to acquire a connection from.
    pool: connection::Pool,

    /// Shared state of this client.
    inner: Arc<Inner>,
}

/// Shared state of a [`Tx`] client.
#[derive(Debug)]
struct Inner {
    /// [`NonTx`] client to reuse the connection of, until the transaction is
    /// started.
    origin: Mutex<Option<NonTx>>,

    /// Started [`connection::Tx`], if any.
    tx: RwLock<Option<connection::Tx>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.tx.get_mut().is_some() {
            tracing::debug!("uncommitted transaction is rolled back");
        }
    }
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            inner: Arc::new(Inner {
                origin: Mutex::new(Some(client)),
                tx: RwLock::new(None),
            }),
        }
    }

    /// Returns the underlying [`Connection`] of this [`Tx`] client, starting
    /// the transaction if not yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        let read = self.inner.tx.read().await;
        let guard = if read.is_some() {
            read
        } else {
            drop(read);

            let mut write = self.inner.tx.write().await;
            if write.is_none() {
                let reused = match self.inner.origin.lock().await.take() {
                    Some(client) => client.take_connection().await,
                    None => None,
                };
                let conn = match reused {
                    Some(c) => c,
                    None => NonTx::acquire(&self.pool)
                        .await
                        .map_err(tracerr::wrap!())?,
                };
                *write = Some(
                    connection::Tx::begin(conn)
                        .await
                        .map_err(tracerr::wrap!())?,
                );
            }
            write.downgrade()
        };

        Ok(RwLockReadGuard::map(guard, |conn| {
            conn.as_ref()
                .expect("connection cannot be dropped while guard is alive")
        }))
    }

    /// Commits the transaction of this [`Tx`] client.
    ///
    /// Does nothing if no statement has been executed yet.
    ///
    /// # Errors
    ///
    /// If failed to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let tx = self.inner.tx.write().await.take();
        match tx {
            Some(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            None => Ok(()),
        }
    }
}

impl Connection for Tx {
    async fn query(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<Vec<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<Option<Row>, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec(
        &self,
        sql: &str,
        params: Params<'_>,
    ) -> Result<u64, Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(sql, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn batch_exec(&self, sql: &str) -> Result<(), Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .batch_exec(sql)
            .await
            .map_err(tracerr::wrap!())
    }
}
