//! Scheduler - Unit Management with May
//!
//! Every invocation runs its callee as a May coroutine (a "unit"). The
//! invoker blocks on its frame's channel, which yields the coroutine
//! rather than the OS thread, so a deep nexting stack costs a few small
//! coroutine stacks instead of a thread per frame.
//!
//! ## Configuration
//!
//! - `CRINGE_STACK_SIZE`: coroutine stack size in bytes (default 128KB)
//! - `CRINGE_POOL_CAPACITY`: coroutine stack pool size (default 10000)
//!
//! Invalid values are logged and ignored.

use may::coroutine;
use std::sync::Once;
use tracing::warn;

static SCHEDULER_INIT: Once = Once::new();

/// Default coroutine stack size: 128KB (0x20000 bytes)
const DEFAULT_STACK_SIZE: usize = 0x20000;

/// Default coroutine pool capacity.
/// May reuses completed coroutine stacks from this pool to avoid allocations.
const DEFAULT_POOL_CAPACITY: usize = 10000;

/// Parse stack size from an optional string value.
/// Returns the parsed size, or DEFAULT_STACK_SIZE if the value is missing, zero, or invalid.
fn parse_stack_size(env_value: Option<String>) -> usize {
    match env_value {
        Some(val) => match val.parse::<usize>() {
            Ok(0) => {
                warn!(
                    "CRINGE_STACK_SIZE=0 is invalid, using default {}",
                    DEFAULT_STACK_SIZE
                );
                DEFAULT_STACK_SIZE
            }
            Ok(size) => size,
            Err(_) => {
                warn!(
                    "CRINGE_STACK_SIZE='{}' is not a valid number, using default {}",
                    val, DEFAULT_STACK_SIZE
                );
                DEFAULT_STACK_SIZE
            }
        },
        None => DEFAULT_STACK_SIZE,
    }
}

fn parse_pool_capacity(env_value: Option<String>) -> usize {
    env_value
        .and_then(|s| s.parse().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_POOL_CAPACITY)
}

/// Configure May once per process. Safe to call repeatedly.
pub fn init() {
    SCHEDULER_INIT.call_once(|| {
        let stack_size = parse_stack_size(std::env::var("CRINGE_STACK_SIZE").ok());
        let pool_capacity = parse_pool_capacity(std::env::var("CRINGE_POOL_CAPACITY").ok());

        may::config()
            .set_stack_size(stack_size)
            .set_pool_capacity(pool_capacity);
    });
}

/// Unit lifecycle statistics for one engine
///
/// - `spawned`: units ever started (the entry unit included)
/// - `completed`: units that have exited
/// - `peak_running`: high-water mark of units not blocked in an invoke
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitStats {
    pub spawned: u64,
    pub completed: u64,
    pub peak_running: usize,
}

impl UnitStats {
    pub(crate) fn record_spawn(&mut self, running: usize) {
        self.spawned += 1;
        self.peak_running = self.peak_running.max(running);
    }

    pub(crate) fn record_exit(&mut self) {
        self.completed += 1;
    }

    /// Units started but not yet exited
    pub fn live(&self) -> u64 {
        self.spawned - self.completed
    }
}

/// Start a detached unit of work.
pub(crate) fn spawn_unit<F>(name: String, body: F) -> std::io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    // SAFETY: unit bodies hold no thread-local borrows across a suspension
    // point; all shared state lives behind the engine's lock.
    let handle = unsafe { coroutine::Builder::new().name(name).spawn(body) }?;
    drop(handle);
    Ok(())
}
