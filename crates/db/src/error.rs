//! Error types for the database binding
use std::path::PathBuf;

use dbhive_registry::Interrupted;
use thiserror::Error;

/// Result type for database operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for database configs, drivers and topology files.
#[derive(Error, Debug)]
pub enum Error {
    /// Neither a driver handle nor a connection string was configured.
    #[error("a connection string is required when no driver handle is provided")]
    NoConnectionString,

    /// A connection string is present but no driver handle was resolved
    /// for it.
    #[error("provide a driver handle in the config, or set a driver type that can be resolved")]
    NoDriverHandle,

    /// The driver kind string is not recognised.
    #[error("unknown driver type '{driver}'")]
    UnknownDriverType {
        /// The rejected driver kind
        driver: String,
    },

    /// The connection string could not be parsed for its driver.
    #[error("invalid {driver} connection string: {reason}")]
    InvalidDsn {
        /// Driver kind the string was parsed for
        driver: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// A derivation source has no structured fields and no connection
    /// string a new database name could be applied to.
    #[error("cannot derive from '{from}': {reason}")]
    NotDerivable {
        /// Name of the source entry
        from: String,
        /// Why the source cannot be retargeted
        reason: &'static str,
    },

    /// The driver kind is recognised but no driver is linked in.
    #[error("no {driver} driver is available in this build")]
    DriverUnavailable {
        /// The driver kind
        driver: &'static str,
    },

    /// Establishing the pool failed.
    #[error("failed to open database: {0}")]
    Connect(#[source] sqlx::Error),

    /// The liveness check after connecting failed.
    #[error("failed to ping database: {0}")]
    Ping(#[source] sqlx::Error),

    /// The caller's context was cancelled or its deadline passed.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] dbhive_registry::Error),

    /// A topology file could not be parsed or applied.
    #[error("topology {}: {reason}", path.display())]
    Topology {
        /// The offending file (empty for in-memory sources)
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Reading a topology file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an `InvalidDsn` error.
    pub fn invalid_dsn(driver: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidDsn {
            driver,
            reason: reason.into(),
        }
    }

    /// Create a `Topology` error.
    pub fn topology(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Topology {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is [`Error::NoConnectionString`], directly or as the
    /// opener failure behind a registry error.
    #[must_use]
    pub fn is_no_connection_string(&self) -> bool {
        matches!(self.root(), Some(Self::NoConnectionString))
    }

    /// Whether this is [`Error::NoDriverHandle`], directly or as the opener
    /// failure behind a registry error.
    #[must_use]
    pub fn is_no_driver_handle(&self) -> bool {
        matches!(self.root(), Some(Self::NoDriverHandle))
    }

    /// Whether the caller's context interrupted the operation.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self.root(), Some(Self::Interrupted(_)))
    }

    fn root(&self) -> Option<&Self> {
        match self {
            Self::Registry(err) => cause_of(err),
            other => Some(other),
        }
    }
}

/// The database error an opener or closer returned, if `err` wraps one.
#[must_use]
pub fn cause_of(err: &dbhive_registry::Error) -> Option<&Error> {
    err.cause()?.downcast_ref::<Error>()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::UnknownDriverType {
                driver: "oracle".into()
            }
            .to_string(),
            "unknown driver type 'oracle'"
        );
        assert_eq!(
            Error::invalid_dsn("mysql", "missing '/'").to_string(),
            "invalid mysql connection string: missing '/'"
        );
    }

    #[test]
    fn test_predicates_see_through_creation_failure() {
        let wrapped = dbhive_registry::Error::CreationFailed {
            name: "orders".into(),
            source: Arc::new(Error::NoConnectionString),
        };
        assert!(cause_of(&wrapped).is_some());

        let err = Error::from(wrapped);
        assert!(err.is_no_connection_string());
        assert!(!err.is_no_driver_handle());
    }

    #[test]
    fn test_predicates_direct() {
        assert!(Error::NoDriverHandle.is_no_driver_handle());
        assert!(Error::from(Interrupted::Cancelled).is_interrupted());
        assert!(!Error::NoConnectionString.is_no_driver_handle());
    }
}
