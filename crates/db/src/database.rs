//! The live resource handed out by the registry.

use sqlx::Connection as _;
use sqlx::{MySqlPool, PgPool, SqlitePool};

use crate::dsn::DriverKind;
use crate::error::{Error, Result};

/// A connected pool for one of the linked drivers.
///
/// Cloning is cheap and yields a handle to the same pool.
#[derive(Debug, Clone)]
pub enum Database {
    /// MySQL / MariaDB pool
    MySql(MySqlPool),
    /// PostgreSQL pool
    Postgres(PgPool),
    /// SQLite pool
    Sqlite(SqlitePool),
}

impl Database {
    /// Driver kind of the pool.
    #[must_use]
    pub const fn driver(&self) -> DriverKind {
        match self {
            Self::MySql(_) => DriverKind::MySql,
            Self::Postgres(_) => DriverKind::Postgres,
            Self::Sqlite(_) => DriverKind::Sqlite,
        }
    }

    /// Check out a connection and ping the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ping`] if acquiring or pinging fails.
    pub async fn ping(&self) -> Result<()> {
        let pinged = match self {
            Self::MySql(pool) => {
                let mut conn = pool.acquire().await.map_err(Error::Ping)?;
                conn.ping().await
            }
            Self::Postgres(pool) => {
                let mut conn = pool.acquire().await.map_err(Error::Ping)?;
                conn.ping().await
            }
            Self::Sqlite(pool) => {
                let mut conn = pool.acquire().await.map_err(Error::Ping)?;
                conn.ping().await
            }
        };
        pinged.map_err(Error::Ping)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        match self {
            Self::MySql(pool) => pool.close().await,
            Self::Postgres(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            Self::MySql(pool) => pool.is_closed(),
            Self::Postgres(pool) => pool.is_closed(),
            Self::Sqlite(pool) => pool.is_closed(),
        }
    }

    /// The MySQL pool, if this is one.
    #[must_use]
    pub const fn as_mysql(&self) -> Option<&MySqlPool> {
        match self {
            Self::MySql(pool) => Some(pool),
            _ => None,
        }
    }

    /// The PostgreSQL pool, if this is one.
    #[must_use]
    pub const fn as_postgres(&self) -> Option<&PgPool> {
        match self {
            Self::Postgres(pool) => Some(pool),
            _ => None,
        }
    }

    /// The SQLite pool, if this is one.
    #[must_use]
    pub const fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self {
            Self::Sqlite(pool) => Some(pool),
            _ => None,
        }
    }
}
