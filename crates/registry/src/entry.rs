//! Per-name state: config plus a lazily created resource slot.
//!
//! Creation follows an explicit check-lock-check-create-unlock sequence:
//!
//! 1. fast path: read the cached resource (shared read lock, never waits on
//!    a creation in flight);
//! 2. note the attempt epoch, then take the slot's creation gate;
//! 3. re-check the cache, since another caller may have finished first;
//! 4. if the epoch moved while waiting, a failed attempt completed under us:
//!    hand its error to this caller as well instead of retrying;
//! 5. otherwise invoke the opener and publish the outcome.
//!
//! When the epoch moved but a release cleared the recorded failure in
//! between (disconnect after a failed attempt), step 4 finds nothing to
//! share and the waiter opens afresh.
//!
//! Callers arriving after a failed attempt has completed observe the new
//! epoch up front and retry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::context::Context;
use crate::error::{Error, Result, SharedError};
use crate::lifecycle::Lifecycle;

/// State guarded by the creation gate.
#[derive(Default)]
struct Gate {
    /// Outcome of the most recent failed attempt.
    last_failure: Option<SharedError>,
    /// Set once the slot has been torn down for good (unregister / close).
    retired: bool,
}

/// Lazily created resource slot with single-flight creation.
pub(crate) struct Slot<R> {
    resource: RwLock<Option<R>>,
    /// Bumped (under the gate) every time an open attempt finishes.
    epoch: AtomicU64,
    gate: Mutex<Gate>,
}

impl<R> Slot<R>
where
    R: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            resource: RwLock::new(None),
            epoch: AtomicU64::new(0),
            gate: Mutex::new(Gate::default()),
        }
    }

    /// Cached resource, if created.
    pub(crate) fn peek(&self) -> Option<R> {
        self.resource.read().clone()
    }

    pub(crate) fn is_present(&self) -> bool {
        self.resource.read().is_some()
    }

    /// Return the cached resource or create it exactly once.
    pub(crate) async fn get_or_open<C>(
        &self,
        name: &str,
        ctx: &Context,
        config: &C,
        lifecycle: &Lifecycle<C, R>,
    ) -> Result<R>
    where
        C: Clone + Send + 'static,
    {
        if let Some(resource) = self.peek() {
            return Ok(resource);
        }

        let observed = self.epoch.load(Ordering::Acquire);
        let mut gate = self.gate.lock().await;

        if gate.retired {
            return Err(Error::not_registered(name));
        }
        if let Some(resource) = self.peek() {
            return Ok(resource);
        }
        if self.epoch.load(Ordering::Acquire) != observed
            && let Some(source) = &gate.last_failure
        {
            return Err(Error::CreationFailed {
                name: name.to_owned(),
                source: Arc::clone(source),
            });
        }

        tracing::debug!(resource = name, "Opening resource");
        let outcome = lifecycle.open(ctx.clone(), config.clone()).await;

        let result = match outcome {
            Ok(resource) => {
                *self.resource.write() = Some(resource.clone());
                gate.last_failure = None;
                tracing::debug!(resource = name, "Opened resource");
                Ok(resource)
            }
            Err(err) => {
                let source: SharedError = Arc::from(err);
                tracing::warn!(resource = name, error = %source, "Opening resource failed");
                gate.last_failure = Some(Arc::clone(&source));
                Err(Error::CreationFailed {
                    name: name.to_owned(),
                    source,
                })
            }
        };
        self.epoch.fetch_add(1, Ordering::AcqRel);
        drop(gate);
        result
    }

    /// Take the resource out of the slot and close it.
    ///
    /// Waits for any creation in flight. With `retire`, later
    /// [`get_or_open`](Self::get_or_open) calls on this slot fail with
    /// `NotRegistered`. Returns whether a resource was present.
    pub(crate) async fn release<C>(
        &self,
        ctx: &Context,
        lifecycle: &Lifecycle<C, R>,
        retire: bool,
    ) -> std::result::Result<bool, SharedError>
    where
        C: Send + 'static,
    {
        let mut gate = self.gate.lock().await;
        if retire {
            gate.retired = true;
        }
        gate.last_failure = None;

        let taken = self.resource.write().take();
        let Some(resource) = taken else {
            return Ok(false);
        };

        lifecycle
            .close(ctx.clone(), resource)
            .await
            .map(|()| true)
            .map_err(SharedError::from)
    }
}

/// One registered name: its config and its resource slot.
pub(crate) struct Entry<C, R> {
    name: String,
    config: C,
    slot: Slot<R>,
}

impl<C, R> Entry<C, R>
where
    C: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: String, config: C) -> Self {
        Self {
            name,
            config,
            slot: Slot::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn config(&self) -> &C {
        &self.config
    }

    pub(crate) fn is_created(&self) -> bool {
        self.slot.is_present()
    }

    pub(crate) async fn get(&self, ctx: &Context, lifecycle: &Lifecycle<C, R>) -> Result<R> {
        self.slot
            .get_or_open(&self.name, ctx, &self.config, lifecycle)
            .await
    }

    /// Retire the entry and close its resource, if any.
    pub(crate) async fn retire(&self, ctx: &Context, lifecycle: &Lifecycle<C, R>) -> Result<()> {
        match self.slot.release(ctx, lifecycle, true).await {
            Ok(closed) => {
                if closed {
                    tracing::debug!(resource = %self.name, "Closed resource");
                }
                Ok(())
            }
            Err(source) => {
                tracing::warn!(resource = %self.name, error = %source, "Closing resource failed");
                Err(Error::CloseFailed {
                    name: self.name.clone(),
                    source,
                })
            }
        }
    }
}
