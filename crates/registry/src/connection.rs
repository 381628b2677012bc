//! Single-resource variant of a group entry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::entry::Slot;
use crate::error::{Error, Result};
use crate::lifecycle::{BoxError, Lifecycle};

const DEFAULT_NAME: &str = "connection";

/// One config, one lazily created resource, no surrounding map.
///
/// Creation follows the same discipline as a [`Group`](crate::Group)
/// entry: concurrent [`connect`](Self::connect) calls invoke the opener
/// once. Unlike an unregistered entry, a disconnected `Connection` can be
/// connected again.
pub struct Connection<C, R> {
    name: String,
    config: C,
    lifecycle: Arc<Lifecycle<C, R>>,
    slot: Slot<R>,
}

impl<C, R> Connection<C, R>
where
    C: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Create a disconnected connection from a config, an opener and a closer.
    pub fn new<O, OFut, OErr, K, KFut, KErr>(config: C, opener: O, closer: K) -> Self
    where
        O: Fn(Context, C) -> OFut + Send + Sync + 'static,
        OFut: Future<Output = std::result::Result<R, OErr>> + Send + 'static,
        OErr: Into<BoxError>,
        K: Fn(Context, R) -> KFut + Send + Sync + 'static,
        KFut: Future<Output = std::result::Result<(), KErr>> + Send + 'static,
        KErr: Into<BoxError>,
    {
        Self::with_lifecycle(config, Arc::new(Lifecycle::new(opener, closer)))
    }

    /// Create a disconnected connection around an existing lifecycle.
    #[must_use]
    pub fn with_lifecycle(config: C, lifecycle: Arc<Lifecycle<C, R>>) -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            config,
            lifecycle,
            slot: Slot::new(),
        }
    }

    /// Set the name used in errors and log events.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The name used in errors and log events.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored config.
    #[must_use]
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Whether the resource is currently created.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.slot.is_present()
    }

    /// Create the resource unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CreationFailed`] if the opener failed.
    pub async fn connect(&self, ctx: &Context) -> Result<()> {
        self.get(ctx).await.map(drop)
    }

    /// The resource, connecting first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CreationFailed`] if the opener failed.
    pub async fn get(&self, ctx: &Context) -> Result<R> {
        self.slot
            .get_or_open(&self.name, ctx, &self.config, &self.lifecycle)
            .await
    }

    /// Close and clear the resource. No-op when not connected.
    ///
    /// The resource is cleared even if the closer fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CloseFailed`] if the closer failed.
    pub async fn disconnect(&self, ctx: &Context) -> Result<()> {
        match self.slot.release(ctx, &self.lifecycle, false).await {
            Ok(true) => {
                tracing::debug!(resource = %self.name, "Disconnected");
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(source) => {
                tracing::warn!(resource = %self.name, error = %source, "Disconnect failed");
                Err(Error::CloseFailed {
                    name: self.name.clone(),
                    source,
                })
            }
        }
    }
}

impl<C, R> fmt::Debug for Connection<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_connect_disconnect_reconnect() {
        let opened = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&opened);
        let conn: Connection<(), Arc<u32>> = Connection::new(
            (),
            move |_ctx, ()| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, std::io::Error>(Arc::new(n)) }
            },
            |_ctx, _res| async move { Ok::<_, std::io::Error>(()) },
        );
        let ctx = Context::new();

        assert!(!conn.is_connected());
        conn.disconnect(&ctx).await.unwrap();

        conn.connect(&ctx).await.unwrap();
        conn.connect(&ctx).await.unwrap();
        assert!(conn.is_connected());
        assert_eq!(*conn.get(&ctx).await.unwrap(), 0);
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        conn.disconnect(&ctx).await.unwrap();
        assert!(!conn.is_connected());
        assert_eq!(*conn.get(&ctx).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_clears_on_close_failure() {
        let conn: Connection<(), ()> = Connection::new(
            (),
            |_ctx, ()| async move { Ok::<_, std::io::Error>(()) },
            |_ctx, ()| async move { Err::<(), _>(std::io::Error::other("stuck")) },
        )
        .named("primary");
        let ctx = Context::new();
        conn.connect(&ctx).await.unwrap();

        let err = conn.disconnect(&ctx).await.unwrap_err();
        assert!(err.is_close_failed());
        assert_eq!(err.name(), "primary");
        assert!(!conn.is_connected());
    }
}
