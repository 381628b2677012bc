//! Counting opener/closer stubs shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use dbhive_registry::{BoxError, Connection, Context, Group, Lifecycle, Manager};

/// Behaviour knobs for one stub entry.
#[derive(Debug, Clone, Default)]
pub struct StubConfig {
    pub open_delay: Duration,
    /// Number of leading open attempts that fail.
    pub fail_opens: u32,
    pub fail_close: bool,
}

impl StubConfig {
    pub fn slow(delay: Duration) -> Self {
        Self {
            open_delay: delay,
            ..Self::default()
        }
    }

    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct StubResource {
    pub serial: u32,
    fail_close: bool,
}

pub type Handle = Arc<StubResource>;

#[derive(Debug, Default)]
pub struct Counters {
    opens: AtomicU32,
    closes: AtomicU32,
}

impl Counters {
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

pub fn stub_lifecycle(counters: &Arc<Counters>) -> Arc<Lifecycle<StubConfig, Handle>> {
    let on_open = Arc::clone(counters);
    let on_close = Arc::clone(counters);
    Arc::new(Lifecycle::new(
        move |ctx: Context, config: StubConfig| {
            let counters = Arc::clone(&on_open);
            async move {
                let serial = counters.opens.fetch_add(1, Ordering::SeqCst);
                if !config.open_delay.is_zero() {
                    ctx.run(tokio::time::sleep(config.open_delay)).await?;
                }
                if serial < config.fail_opens {
                    return Err(BoxError::from(format!("open refused (attempt {serial})")));
                }
                Ok(Arc::new(StubResource {
                    serial,
                    fail_close: config.fail_close,
                }))
            }
        },
        move |_ctx: Context, resource: Handle| {
            let counters = Arc::clone(&on_close);
            async move {
                counters.closes.fetch_add(1, Ordering::SeqCst);
                if resource.fail_close {
                    Err(BoxError::from("close refused"))
                } else {
                    Ok(())
                }
            }
        },
    ))
}

pub fn stub_group() -> (Arc<Group<StubConfig, Handle>>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let group = Group::with_lifecycle(stub_lifecycle(&counters));
    (Arc::new(group), counters)
}

pub fn stub_manager() -> (Manager<StubConfig, Handle>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    (Manager::with_lifecycle(stub_lifecycle(&counters)), counters)
}

pub fn stub_connection(config: StubConfig) -> (Arc<Connection<StubConfig, Handle>>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let conn = Connection::with_lifecycle(config, stub_lifecycle(&counters));
    (Arc::new(conn), counters)
}
