//! Error types for registry operations
use std::sync::Arc;

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Opener/closer failure shared between every caller that observed it.
///
/// Concurrent callers waiting on the same creation attempt all receive the
/// same underlying error, so it is reference-counted rather than boxed.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Error type for registry operations.
///
/// `NotRegistered` means the name was never configured (or was removed);
/// `CreationFailed` means it is configured but the opener currently fails.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The named resource does not exist in the group.
    #[error("resource '{name}' is not registered")]
    NotRegistered {
        /// The resource name
        name: String,
    },

    /// The named group does not exist in the manager.
    #[error("group '{name}' not found")]
    GroupNotFound {
        /// The group name
        name: String,
    },

    /// The opener returned an error; the entry stays uncreated.
    #[error("failed to open resource '{name}': {source}")]
    CreationFailed {
        /// The resource name
        name: String,
        /// The opener's error
        #[source]
        source: SharedError,
    },

    /// The closer returned an error during teardown.
    #[error("failed to close resource '{name}': {source}")]
    CloseFailed {
        /// The resource name
        name: String,
        /// The closer's error
        #[source]
        source: SharedError,
    },

    /// An error raised inside a named group of a manager.
    #[error("group '{group}': {source}")]
    Group {
        /// The group name
        group: String,
        /// The group-level error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a `NotRegistered` error.
    pub fn not_registered(name: impl Into<String>) -> Self {
        Self::NotRegistered { name: name.into() }
    }

    /// Create a `GroupNotFound` error.
    pub fn group_not_found(name: impl Into<String>) -> Self {
        Self::GroupNotFound { name: name.into() }
    }

    /// Tag an error with the group it was raised in.
    pub fn in_group(self, group: impl Into<String>) -> Self {
        Self::Group {
            group: group.into(),
            source: Box::new(self),
        }
    }

    /// Whether the referenced resource was never registered (or already removed).
    #[must_use]
    pub fn is_not_registered(&self) -> bool {
        matches!(self.innermost(), Self::NotRegistered { .. })
    }

    /// Whether the referenced group does not exist.
    #[must_use]
    pub fn is_group_not_found(&self) -> bool {
        matches!(self.innermost(), Self::GroupNotFound { .. })
    }

    /// Whether the opener failed.
    #[must_use]
    pub fn is_creation_failed(&self) -> bool {
        matches!(self.innermost(), Self::CreationFailed { .. })
    }

    /// Whether the closer failed.
    #[must_use]
    pub fn is_close_failed(&self) -> bool {
        matches!(self.innermost(), Self::CloseFailed { .. })
    }

    /// The resource or group name this error refers to.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::NotRegistered { name }
            | Self::GroupNotFound { name }
            | Self::CreationFailed { name, .. }
            | Self::CloseFailed { name, .. } => name,
            Self::Group { source, .. } => source.name(),
        }
    }

    /// The group this error was raised in, when it came through a manager.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Group { group, .. } => Some(group),
            _ => None,
        }
    }

    /// The opener/closer error behind `CreationFailed` / `CloseFailed`.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self.innermost() {
            Self::CreationFailed { source, .. } | Self::CloseFailed { source, .. } => Some(&**source),
            _ => None,
        }
    }

    fn innermost(&self) -> &Self {
        match self {
            Self::Group { source, .. } => source.innermost(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_failure(msg: &str) -> SharedError {
        Arc::new(std::io::Error::other(msg.to_string()))
    }

    #[test]
    fn test_not_registered_display() {
        let err = Error::not_registered("orders");
        assert_eq!(err.to_string(), "resource 'orders' is not registered");
        assert!(err.is_not_registered());
        assert!(!err.is_creation_failed());
        assert_eq!(err.name(), "orders");
    }

    #[test]
    fn test_creation_failed_exposes_cause() {
        let err = Error::CreationFailed {
            name: "orders".into(),
            source: io_failure("connection refused"),
        };
        assert!(err.is_creation_failed());
        assert_eq!(
            err.cause().map(ToString::to_string).as_deref(),
            Some("connection refused")
        );
    }

    #[test]
    fn test_group_tag_is_transparent_to_predicates() {
        let err = Error::CloseFailed {
            name: "orders".into(),
            source: io_failure("broken pipe"),
        }
        .in_group("tenant-a");

        assert_eq!(err.group(), Some("tenant-a"));
        assert_eq!(err.name(), "orders");
        assert!(err.is_close_failed());
        assert!(err.cause().is_some());
        assert_eq!(
            err.to_string(),
            "group 'tenant-a': failed to close resource 'orders': broken pipe"
        );
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = Error::CreationFailed {
            name: "x".into(),
            source: io_failure("boom"),
        };
        let clone = err.clone();
        match (&err, &clone) {
            (
                Error::CreationFailed { source: a, .. },
                Error::CreationFailed { source: b, .. },
            ) => assert!(Arc::ptr_eq(a, b)),
            _ => unreachable!(),
        }
    }
}
