//! Cancellation and deadline context handed to openers and closers
//!
//! The registry itself never times anything out: it forwards the caller's
//! [`Context`] to the opener/closer, which use [`Context::run`] to bail out
//! promptly once the caller gives up.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`Context::run`] call stopped before its future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    /// The context's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
    /// The context's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Context for registry operations.
///
/// Carries a cooperative cancellation token, an optional deadline and
/// arbitrary metadata. Cloning is cheap; clones share the same token.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    metadata: HashMap<String, String>,
}

impl Context {
    /// Create a context with no deadline and a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for [`Context::new`], for call sites that want to say
    /// "no caller-imposed limits".
    pub fn background() -> Self {
        Self::default()
    }

    /// Set the deadline to `timeout` from now.
    ///
    /// An earlier deadline already on the context wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline. An earlier deadline already on the context wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Replace the cancellation token with the provided one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Add a key-value metadata pair to the context.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The cancellation token shared by this context and its clones.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Metadata value for `key`.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Whether the cancellation token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Whether the deadline has already passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= Instant::now())
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Drive `future` to completion unless the context is cancelled or its
    /// deadline passes first.
    ///
    /// When interrupted, `future` is dropped before this returns.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
                output = tokio::time::timeout_at(deadline, future) => {
                    output.map_err(|_| Interrupted::DeadlineExceeded)
                }
            },
            None => tokio::select! {
                biased;
                () = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
                output = future => Ok(output),
            },
        }
    }
}
