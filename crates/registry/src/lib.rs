//! # dbhive registry
//!
//! Lifecycle management for named, expensive-to-create resources.
//!
//! Resources are declared by configuration, created lazily on first use,
//! reused thereafter and torn down explicitly or in bulk:
//!
//! - [`Group`]: flat namespace of entries sharing one [`Lifecycle`]
//!   (opener + closer pair).
//! - [`Manager`]: namespace of groups, closed and queried as one unit.
//! - [`Connection`]: the single-resource variant, no surrounding map.
//!
//! The registry never inspects configs or resources; it only passes them to
//! the opener and closer together with the caller's [`Context`].
//!
//! ```rust
//! use std::sync::Arc;
//! use dbhive_registry::{Context, Group};
//!
//! # async fn demo() -> dbhive_registry::Result<()> {
//! let group: Group<String, Arc<String>> = Group::new(
//!     |_ctx, dsn: String| async move { Ok::<_, std::io::Error>(Arc::new(dsn)) },
//!     |_ctx, _handle| async move { Ok::<_, std::io::Error>(()) },
//! );
//!
//! group.register("primary", "mem://primary".to_string())?;
//! let handle = group.get(&Context::new(), "primary").await?;
//! assert_eq!(handle.as_str(), "mem://primary");
//! assert!(group.close(&Context::new()).await.is_empty());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod connection;
pub mod context;
mod entry;
pub mod error;
pub mod group;
pub mod lifecycle;
pub mod manager;

pub use connection::Connection;
pub use context::{Context, Interrupted};
pub use error::{Error, Result, SharedError};
pub use group::Group;
pub use lifecycle::{BoxError, CloseFuture, Lifecycle, OpenFuture};
pub use manager::Manager;
