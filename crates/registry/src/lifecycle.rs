//! The opener/closer pair shared by every entry of a registry.
//!
//! A [`Lifecycle`] is supplied once when a [`Group`](crate::Group),
//! [`Manager`](crate::Manager) or [`Connection`](crate::Connection) is
//! constructed. The registry only ever calls it; it never looks inside the
//! config or the resource.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;

use crate::context::Context;

/// Type-erased opener/closer error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by an opener.
pub type OpenFuture<R> = BoxFuture<'static, Result<R, BoxError>>;

/// Future returned by a closer.
pub type CloseFuture = BoxFuture<'static, Result<(), BoxError>>;

type OpenFn<C, R> = dyn Fn(Context, C) -> OpenFuture<R> + Send + Sync;
type CloseFn<R> = dyn Fn(Context, R) -> CloseFuture + Send + Sync;

/// Opener + closer pair.
///
/// - the opener turns a config into a live resource, including any
///   readiness check, honouring the caller's [`Context`];
/// - the closer releases a resource previously returned by the opener. It
///   is called at most once per successful open.
pub struct Lifecycle<C, R> {
    opener: Box<OpenFn<C, R>>,
    closer: Box<CloseFn<R>>,
}

impl<C, R> Lifecycle<C, R>
where
    C: Send + 'static,
    R: Send + 'static,
{
    /// Build a lifecycle from two async callbacks.
    ///
    /// Any error type convertible into [`BoxError`] is accepted; it is
    /// surfaced to callers as the source of
    /// [`Error::CreationFailed`](crate::Error::CreationFailed) or
    /// [`Error::CloseFailed`](crate::Error::CloseFailed).
    pub fn new<O, OFut, OErr, K, KFut, KErr>(opener: O, closer: K) -> Self
    where
        O: Fn(Context, C) -> OFut + Send + Sync + 'static,
        OFut: Future<Output = Result<R, OErr>> + Send + 'static,
        OErr: Into<BoxError>,
        K: Fn(Context, R) -> KFut + Send + Sync + 'static,
        KFut: Future<Output = Result<(), KErr>> + Send + 'static,
        KErr: Into<BoxError>,
    {
        Self {
            opener: Box::new(move |ctx: Context, config: C| -> OpenFuture<R> {
                let opening = opener(ctx, config);
                Box::pin(async move { opening.await.map_err(Into::<BoxError>::into) })
            }),
            closer: Box::new(move |ctx: Context, resource: R| -> CloseFuture {
                let closing = closer(ctx, resource);
                Box::pin(async move { closing.await.map_err(Into::<BoxError>::into) })
            }),
        }
    }

    /// Invoke the opener.
    pub fn open(&self, ctx: Context, config: C) -> OpenFuture<R> {
        (self.opener)(ctx, config)
    }

    /// Invoke the closer.
    pub fn close(&self, ctx: Context, resource: R) -> CloseFuture {
        (self.closer)(ctx, resource)
    }
}

impl<C, R> fmt::Debug for Lifecycle<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle").finish_non_exhaustive()
    }
}
