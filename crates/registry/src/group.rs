//! Group: a flat namespace of lazily created resources.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::context::Context;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::lifecycle::{BoxError, Lifecycle};

/// Named entries sharing one opener/closer pair.
///
/// The map lock only guards structural changes (register / unregister /
/// close). Creating a resource takes that entry's own creation lock, so a
/// slow opener on one name never blocks `get` on another.
///
/// A group handed out by a [`Manager`](crate::Manager) is detached when the
/// manager closes or removes it. From then on `register` and `get` fail
/// with [`Error::GroupNotFound`], so a handle kept past teardown cannot
/// open resources nobody will close.
pub struct Group<C, R> {
    lifecycle: Arc<Lifecycle<C, R>>,
    entries: RwLock<HashMap<String, Arc<Entry<C, R>>>>,
    /// Set under the `entries` write lock once the owning manager let go.
    detached: OnceLock<String>,
}

impl<C, R> Group<C, R>
where
    C: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Create an empty group from an opener and a closer.
    pub fn new<O, OFut, OErr, K, KFut, KErr>(opener: O, closer: K) -> Self
    where
        O: Fn(Context, C) -> OFut + Send + Sync + 'static,
        OFut: Future<Output = std::result::Result<R, OErr>> + Send + 'static,
        OErr: Into<BoxError>,
        K: Fn(Context, R) -> KFut + Send + Sync + 'static,
        KFut: Future<Output = std::result::Result<(), KErr>> + Send + 'static,
        KErr: Into<BoxError>,
    {
        Self::with_lifecycle(Arc::new(Lifecycle::new(opener, closer)))
    }

    /// Create an empty group sharing an existing lifecycle.
    #[must_use]
    pub fn with_lifecycle(lifecycle: Arc<Lifecycle<C, R>>) -> Self {
        Self {
            lifecycle,
            entries: RwLock::new(HashMap::new()),
            detached: OnceLock::new(),
        }
    }

    /// The opener/closer pair used by every entry of this group.
    #[must_use]
    pub fn lifecycle(&self) -> &Arc<Lifecycle<C, R>> {
        &self.lifecycle
    }

    /// Register `config` under `name` without creating anything.
    ///
    /// Returns `true` if the name was inserted, `false` if it was already
    /// present; in that case the stored config is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupNotFound`] once the owning manager has closed
    /// or removed this group.
    pub fn register(&self, name: impl Into<String>, config: C) -> Result<bool> {
        let name = name.into();
        let mut entries = self.entries.write();
        if let Some(group) = self.detached.get() {
            return Err(Error::group_not_found(group));
        }
        if entries.contains_key(&name) {
            tracing::debug!(resource = %name, "Resource already registered");
            return Ok(false);
        }
        tracing::debug!(resource = %name, "Registered resource");
        entries.insert(name.clone(), Arc::new(Entry::new(name, config)));
        Ok(true)
    }

    /// Get the resource for `name`, creating it on first use.
    ///
    /// Concurrent callers on the same uncreated name share a single opener
    /// invocation and all observe its outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRegistered`] if `name` is unknown (or was removed).
    /// - [`Error::GroupNotFound`] if the owning manager let go of the group.
    /// - [`Error::CreationFailed`] if the opener failed; the entry stays
    ///   uncreated and a later call retries.
    pub async fn get(&self, ctx: &Context, name: &str) -> Result<R> {
        let entry = self.entry(name)?;
        entry.get(ctx, &self.lifecycle).await
    }

    /// Like [`get`](Self::get), panicking on error.
    ///
    /// For startup wiring where a missing or broken resource is a
    /// programming error.
    ///
    /// # Panics
    ///
    /// Panics if `get` fails.
    pub async fn must_get(&self, ctx: &Context, name: &str) -> R {
        match self.get(ctx, name).await {
            Ok(resource) => resource,
            Err(err) => panic!("must_get({name}): {err}"),
        }
    }

    /// Clone of the config stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] if `name` is unknown.
    pub fn config(&self, name: &str) -> Result<C> {
        self.entry(name).map(|entry| entry.config().clone())
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Whether the resource for `name` has been created.
    #[must_use]
    pub fn is_created(&self, name: &str) -> bool {
        self.entries
            .read()
            .get(name)
            .is_some_and(|entry| entry.is_created())
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether the owning manager has closed or removed this group.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached.get().is_some()
    }

    /// Sorted snapshot of registered names.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Close the resource for `name` (if created) and remove the name.
    ///
    /// The entry is removed even when the closer fails.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRegistered`] if `name` is unknown.
    /// - [`Error::CloseFailed`] if the closer failed.
    pub async fn unregister(&self, ctx: &Context, name: &str) -> Result<()> {
        let entry = self.entry(name)?;
        let closed = entry.retire(ctx, &self.lifecycle).await;

        {
            let mut entries = self.entries.write();
            if entries
                .get(name)
                .is_some_and(|current| Arc::ptr_eq(current, &entry))
            {
                entries.remove(name);
            }
        }
        tracing::debug!(resource = name, "Unregistered resource");
        closed
    }

    /// Close every created resource and empty the group.
    ///
    /// Entries are closed concurrently; one failing closer never stops the
    /// others. Returned errors are ordered by entry name.
    pub async fn close(&self, ctx: &Context) -> Vec<Error> {
        let drained = self.entries.write().drain().map(|(_, entry)| entry).collect();
        self.close_entries(ctx, drained).await
    }

    /// Refuse further registrations, then close like [`close`](Self::close).
    pub(crate) async fn detach(&self, ctx: &Context, group: &str) -> Vec<Error> {
        let drained = {
            let mut entries = self.entries.write();
            let _ = self.detached.set(group.to_owned());
            entries.drain().map(|(_, entry)| entry).collect()
        };
        self.close_entries(ctx, drained).await
    }

    async fn close_entries(
        &self,
        ctx: &Context,
        mut drained: Vec<Arc<Entry<C, R>>>,
    ) -> Vec<Error> {
        if drained.is_empty() {
            return Vec::new();
        }
        drained.sort_unstable_by(|a, b| a.name().cmp(b.name()));

        let lifecycle = &self.lifecycle;
        let results = futures::future::join_all(
            drained.iter().map(|entry| entry.retire(ctx, lifecycle)),
        )
        .await;

        let errors: Vec<Error> = results.into_iter().filter_map(Result::err).collect();
        tracing::debug!(
            closed = drained.len(),
            failed = errors.len(),
            "Closed group"
        );
        errors
    }

    fn entry(&self, name: &str) -> Result<Arc<Entry<C, R>>> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| match self.detached.get() {
                Some(group) => Error::group_not_found(group),
                None => Error::not_registered(name),
            })
    }
}

impl<C, R> fmt::Debug for Group<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("entries", &self.entries.read().len())
            .field("detached", &self.detached.get())
            .finish_non_exhaustive()
    }
}
