//! [PostgreSQL] implementation of the [`Database`].
//!
//! [PostgreSQL]: https://www.postgresql.org

pub mod client;
pub mod connection;
mod impls;
mod migrations;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::NoTls;
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
};

pub use deadpool_postgres::{Config, PoolConfig};

/// [`Database`] backed by a pool of PostgreSQL connections.
///
/// `T` is either [`NonTx`] or [`Tx`], so the same operations are available
/// inside and outside of a transaction.
#[derive(Clone, Copy, Debug, Deref)]
pub struct Postgres<T = NonTx>(T);

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// No connection is established until the first operation.
    ///
    /// # Errors
    ///
    /// If the [`Config`] doesn't describe a valid [`connection::Pool`].
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        tracing::debug!(
            db.host = ?conf.host,
            db.name = ?conf.dbname,
            db.pool_size = pool.status().max_size,
            "Postgres pool created",
        );
        Ok(Self(NonTx::from_pool(pool)))
    }
}

/// [`Postgres`] error.
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Query or [`Connection`] failure.
    #[display("`Connection` error: {_0}")]
    Connection(connection::Error),

    /// [`Config`] cannot be turned into a [`connection::Pool`].
    #[display("Failed to create `connection::Pool`: {_0}")]
    PoolCreationError(connection::PoolCreationError),

    /// No [`Connection`] could be taken from the [`connection::Pool`].
    #[display("`connection::Pool` error: {_0}")]
    PoolError(connection::PoolError),

    /// Schema migration failure.
    #[display("Failed to migrate schema: {_0}")]
    Migration(refinery::Error),
}
