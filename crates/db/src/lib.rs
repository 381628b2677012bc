//! # dbhive db
//!
//! Database binding for [`dbhive_registry`]: a [`DbConfig`] per name, an
//! sqlx-backed opener that validates, connects, tunes the pool and pings,
//! and helpers for deriving per-schema entries and loading whole
//! topologies from YAML or TOML.
//!
//! ```rust,no_run
//! use dbhive_db::{Context, DbConfig, new_manager};
//!
//! # async fn demo() -> dbhive_db::Result<()> {
//! let manager = new_manager();
//! manager.add_group("primary");
//! let group = manager.group("primary")?;
//! group.register(
//!     "default",
//!     DbConfig {
//!         driver_type: "sqlite".into(),
//!         db_name: "app.db".into(),
//!         ..DbConfig::default()
//!     }
//!     .prepared()?,
//! )?;
//!
//! let db = group.get(&Context::new(), "default").await?;
//! db.ping().await?;
//! manager.close(&Context::new()).await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod database;
pub mod derive;
pub mod dialector;
pub mod dsn;
pub mod error;
pub mod lifecycle;
pub mod topology;

pub use config::DbConfig;
pub use database::Database;
pub use derive::{batch_must_register_to_db, must_register_to_db, register_to_db};
pub use dialector::Dialector;
pub use dsn::DriverKind;
pub use error::{Error, Result, cause_of};
pub use lifecycle::{
    Connection, Group, Manager, close, connection, default_manager, lifecycle, new_group,
    new_manager, open,
};
pub use topology::{DeriveSpec, GroupSpec, Topology};

pub use dbhive_registry::{Context, Interrupted};
