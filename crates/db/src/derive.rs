//! Registering new databases derived from an existing entry's config.
//!
//! A typical topology registers one fully specified `default` entry per
//! group and derives the per-schema entries from it:
//!
//! ```rust,no_run
//! use dbhive_db::{DbConfig, batch_must_register_to_db, new_group};
//!
//! let group = new_group();
//! group.register("default", DbConfig {
//!     driver_type: "mysql".into(),
//!     host: "db1".into(),
//!     port: 3306,
//!     user: "app".into(),
//!     db_name: "app".into(),
//!     ..DbConfig::default()
//! })?;
//! batch_must_register_to_db(&group, "default", [("order", "order_db"), ("goods", "goods_db")]);
//! # Ok::<(), dbhive_db::Error>(())
//! ```

use crate::config::DbConfig;
use crate::dsn::{self, DriverKind};
use crate::error::{Error, Result};
use crate::lifecycle::Group;

/// Register `to` in `group` with `from`'s config retargeted at `to_db_name`.
///
/// Everything except the name and the database is inherited. The
/// connection string is re-derived from the structured fields; a source
/// declared only by its connection string (no host) has the database part
/// of that string rewritten instead. A fresh driver handle is resolved for
/// the result. Returns whether `to` was newly inserted. An existing `to`
/// keeps its config.
///
/// # Errors
///
/// - [`Error::Registry`] wrapping `NotRegistered` when `from` is unknown.
/// - [`Error::NotDerivable`] when the source carries only a pre-built
///   driver handle.
/// - [`Error::InvalidDsn`] when the source's connection string has no
///   database part, and driver resolution errors from
///   [`DbConfig::prepare`].
pub fn register_to_db(group: &Group, from: &str, to: &str, to_db_name: &str) -> Result<bool> {
    let derived = derive_config(group.config(from)?, from, to, to_db_name)?;
    let inserted = group.register(to, derived)?;
    tracing::debug!(from, to, db_name = to_db_name, inserted, "Derived database");
    Ok(inserted)
}

/// Like [`register_to_db`], panicking on error.
///
/// Meant for startup wiring, where a missing source is a programming error.
///
/// # Panics
///
/// Panics if [`register_to_db`] fails.
pub fn must_register_to_db(group: &Group, from: &str, to: &str, to_db_name: &str) -> bool {
    match register_to_db(group, from, to, to_db_name) {
        Ok(inserted) => inserted,
        Err(err) => panic!("register {to} from {from}: {err}"),
    }
}

/// [`must_register_to_db`] for every `(to, to_db_name)` pair.
///
/// The first failure panics; pairs before it stay registered.
///
/// # Panics
///
/// Panics if any registration fails.
pub fn batch_must_register_to_db<I, K, V>(group: &Group, from: &str, targets: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (to, to_db_name) in targets {
        must_register_to_db(group, from, to.as_ref(), to_db_name.as_ref());
    }
}

fn derive_config(mut config: DbConfig, from: &str, to: &str, to_db_name: &str) -> Result<DbConfig> {
    to.clone_into(&mut config.name);
    to_db_name.clone_into(&mut config.db_name);
    config.dialector = None;

    match config.driver_type.parse::<DriverKind>() {
        Ok(kind) if kind != DriverKind::Sqlite && config.host.is_empty() => {
            if config.dsn.is_empty() {
                return Err(Error::NotDerivable {
                    from: from.to_owned(),
                    reason: "no host and no connection string to retarget",
                });
            }
            config.dsn = dsn::retarget(kind, &config.dsn, to_db_name)?;
        }
        _ => config.dsn.clear(),
    }

    config.prepare()?;
    Ok(config)
}
