//! Fire-and-forget timers used by the router bridge.
//!
//! Tasks never get cancelled once scheduled. On native targets they run on the ambient tokio
//! runtime (or a lazily created background one), on `wasm32` through `spawn_local` and
//! `gloo-timers`.

use std::sync::LazyLock;
use std::time::Duration;

use crate::logger::Logger;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@ngx-matomo/scheduler"));

/// A deferred unit of work. Native schedulers may run it on another thread.
#[cfg(not(target_arch = "wasm32"))]
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;
#[cfg(target_arch = "wasm32")]
pub type ScheduledTask = Box<dyn FnOnce() + 'static>;

/// `Send + Sync` on native targets, no bound on `wasm32` where everything is single threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

pub trait Scheduler {
    /// Runs `task` once `delay` has elapsed. A zero delay still runs it on a later turn.
    fn schedule(&self, delay: Duration, task: ScheduledTask);
}

/// Scheduler backed by the platform async runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuntimeScheduler;

impl Scheduler for RuntimeScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        LOGGER.debug(format!("scheduling task in {}ms", delay.as_millis()));
        spawn_detached(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            task();
        });
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_detached<F>(future: F)
where
    F: std::future::Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_detached<F>(future: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    use tokio::runtime::{Builder, Handle, Runtime};

    static BACKGROUND_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
        Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("matomo-scheduler")
            .enable_time()
            .build()
            .expect("failed to build background tokio runtime")
    });

    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => {
            BACKGROUND_RUNTIME.spawn(future);
        }
    }
}

#[cfg(target_arch = "wasm32")]
async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}
