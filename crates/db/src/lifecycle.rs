//! Opener and closer for [`Database`], and registry constructors bound to
//! them.

use std::sync::{Arc, LazyLock};

use dbhive_registry::{Context, Lifecycle};

use crate::config::DbConfig;
use crate::database::Database;
use crate::error::{Error, Result};

/// Group of named databases.
pub type Group = dbhive_registry::Group<DbConfig, Database>;

/// Manager of database groups.
pub type Manager = dbhive_registry::Manager<DbConfig, Database>;

/// Single lazily opened database.
pub type Connection = dbhive_registry::Connection<DbConfig, Database>;

/// Open a database from `config`.
///
/// Validates the config, connects with the configured pool tuning and
/// pings once, all under `ctx`. A pool whose ping fails is closed before
/// the error is returned.
///
/// # Errors
///
/// - [`Error::NoConnectionString`](crate::Error::NoConnectionString) /
///   [`Error::NoDriverHandle`](crate::Error::NoDriverHandle) from validation.
/// - [`Error::Connect`](crate::Error::Connect) /
///   [`Error::Ping`](crate::Error::Ping) from the driver.
/// - [`Error::Interrupted`](crate::Error::Interrupted) when `ctx` is
///   cancelled or expires first.
pub async fn open(ctx: Context, config: DbConfig) -> Result<Database> {
    config.validate()?;
    let Some(dialector) = config.dialector.as_ref() else {
        return Err(Error::NoDriverHandle);
    };

    let db = ctx.run(dialector.connect(&config)).await??;
    let pinged = ctx.run(db.ping()).await.map_err(Error::from).flatten();
    if let Err(err) = pinged {
        tracing::warn!(database = %config.name, error = %err, "Ping failed, closing pool");
        db.close().await;
        return Err(err);
    }

    tracing::debug!(database = %config.name, driver = %db.driver(), "Opened database");
    Ok(db)
}

/// Close a database opened by [`open`].
///
/// # Errors
///
/// Returns [`Error::Interrupted`](crate::Error::Interrupted) if `ctx` gives
/// up before the pool has drained.
pub async fn close(ctx: Context, db: Database) -> Result<()> {
    ctx.run(db.close()).await?;
    Ok(())
}

/// The [`open`] / [`close`] pair.
#[must_use]
pub fn lifecycle() -> Arc<Lifecycle<DbConfig, Database>> {
    Arc::new(Lifecycle::new(open, close))
}

/// Empty group of databases.
#[must_use]
pub fn new_group() -> Group {
    Group::with_lifecycle(lifecycle())
}

/// Empty manager of database groups, independent of [`default_manager`].
#[must_use]
pub fn new_manager() -> Manager {
    Manager::with_lifecycle(lifecycle())
}

/// Disconnected single database.
#[must_use]
pub fn connection(config: DbConfig) -> Connection {
    let name = if config.name.is_empty() {
        "database".to_owned()
    } else {
        config.name.clone()
    };
    Connection::with_lifecycle(config, lifecycle()).named(name)
}

static DEFAULT_MANAGER: LazyLock<Manager> = LazyLock::new(new_manager);

/// Process-wide manager, created on first access and never reset.
///
/// Tests and embedders wanting isolation should use [`new_manager`].
#[must_use]
pub fn default_manager() -> &'static Manager {
    &DEFAULT_MANAGER
}
