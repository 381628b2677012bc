//! Manager: a namespace of groups closed and queried as one unit.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::group::Group;
use crate::lifecycle::{BoxError, Lifecycle};

/// Groups keyed by group name.
///
/// Group names are independent of resource names: the same resource name
/// may appear in several groups. Every group shares the manager's
/// lifecycle.
pub struct Manager<C, R> {
    lifecycle: Arc<Lifecycle<C, R>>,
    groups: RwLock<HashMap<String, Arc<Group<C, R>>>>,
}

impl<C, R> Manager<C, R>
where
    C: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Create an empty manager from an opener and a closer.
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

    /// Create an empty manager around an existing lifecycle.
    #[must_use]
    pub fn with_lifecycle(lifecycle: Arc<Lifecycle<C, R>>) -> Self {
        Self {
            lifecycle,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Create group `name` if it does not exist yet.
    ///
    /// Returns whether the group already existed.
    pub fn add_group(&self, name: impl Into<String>) -> bool {
        let name = name.into();
        let mut groups = self.groups.write();
        if groups.contains_key(&name) {
            return true;
        }
        tracing::info!(group = %name, "Added group");
        groups.insert(
            name,
            Arc::new(Group::with_lifecycle(Arc::clone(&self.lifecycle))),
        );
        false
    }

    /// Look up group `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupNotFound`] if the group does not exist.
    pub fn group(&self, name: &str) -> Result<Arc<Group<C, R>>> {
        self.groups
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::group_not_found(name))
    }

    /// Look up group `name`, panicking if it does not exist.
    ///
    /// Only meant for startup wiring.
    ///
    /// # Panics
    ///
    /// Panics if the group does not exist.
    #[must_use]
    pub fn must_group(&self, name: &str) -> Arc<Group<C, R>> {
        match self.group(name) {
            Ok(group) => group,
            Err(err) => panic!("must_group: {err}"),
        }
    }

    /// Sorted snapshot of group names.
    #[must_use]
    pub fn list_group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Whether the manager holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Close every resource of group `name`, then drop the group.
    ///
    /// Handles to the group obtained earlier are detached and refuse new
    /// registrations. Returns the group's close errors, tagged with the group name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GroupNotFound`] if the group does not exist.
    pub async fn remove_group(&self, ctx: &Context, name: &str) -> Result<Vec<Error>> {
        let group = self
            .groups
            .write()
            .remove(name)
            .ok_or_else(|| Error::group_not_found(name))?;

        let errors = group
            .detach(ctx, name)
            .await
            .into_iter()
            .map(|err| err.in_group(name))
            .collect();
        tracing::info!(group = name, "Removed group");
        Ok(errors)
    }

    /// Close every group and empty the manager.
    ///
    /// Outstanding group handles are detached, as in
    /// [`remove_group`](Self::remove_group). One group's failures never
    /// stop the others. Every error is tagged with its group; groups are
    /// visited in name order.
    pub async fn close(&self, ctx: &Context) -> Vec<Error> {
        let mut drained: Vec<(String, Arc<Group<C, R>>)> = self.groups.write().drain().collect();
        drained.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

        let mut errors = Vec::new();
        for (name, group) in drained {
            errors.extend(
                group
                    .detach(ctx, &name)
                    .await
                    .into_iter()
                    .map(|err| err.in_group(name.as_str())),
            );
        }
        if errors.is_empty() {
            tracing::info!("Closed manager");
        } else {
            tracing::warn!(failed = errors.len(), "Closed manager with errors");
        }
        errors
    }
}

impl<C, R> fmt::Debug for Manager<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("groups", &self.groups.read().len())
            .finish_non_exhaustive()
    }
}
