//! Game Loop: fixed-cadence background ticker for timed actions.
//!
//! Responsibilities:
//! - Shared time base (seconds since start, delta since previous tick)
//! - Thread-safe action registry, dispatched over a snapshot each tick
//! - Named background thread with start/stop lifecycle

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::config::LoopConfig;
use crate::error::{Error, Result};

/// Anything advanced by the loop. `time` and `delta` are in seconds.
pub trait TimedAction: Send {
    fn update(&mut self, time: f64, delta: f64);
}

/// An action the caller keeps a handle to while the loop drives it.
pub type SharedAction = Arc<Mutex<dyn TimedAction>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u64);

impl ActionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Tick Clock
// ============================================================================

/// Converts wall-clock instants into `(time, delta)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    start: Instant,
    last: Instant,
}

impl TickClock {
    pub fn new(start: Instant) -> Self {
        Self { start, last: start }
    }

    /// Record a tick at `now`. The first delta is measured from `start`.
    pub fn sample(&mut self, now: Instant) -> (f64, f64) {
        let time = now.saturating_duration_since(self.start).as_secs_f64();
        let delta = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        (time, delta)
    }
}

// ============================================================================
// Action Registry
// ============================================================================

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    actions: Vec<(ActionId, SharedAction)>,
}

/// Cloneable handle to the set of actions a loop dispatches.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action owned by the registry.
    pub fn add<A: TimedAction + 'static>(&self, action: A) -> Result<ActionId> {
        self.add_shared(Arc::new(Mutex::new(action)))
    }

    /// Register an action the caller also holds.
    pub fn add_shared(&self, action: SharedAction) -> Result<ActionId> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = ActionId(inner.next_id);
        inner.actions.push((id, action));
        debug!(id = id.0, "timed action registered");
        Ok(id)
    }

    /// Unregister an action. A tick already in flight may still run it once.
    pub fn remove(&self, id: ActionId) -> Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.actions.len();
        inner.actions.retain(|(action_id, _)| *action_id != id);
        Ok(inner.actions.len() != before)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.actions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered actions in registration order.
    pub fn snapshot(&self) -> Result<Vec<SharedAction>> {
        Ok(self
            .lock()?
            .actions
            .iter()
            .map(|(_, action)| Arc::clone(action))
            .collect())
    }

    /// Run every registered action once. The registry lock is released
    /// before any action runs, so actions may register or remove others.
    ///
    /// An action that panics or whose lock is poisoned is skipped with a
    /// warning. Returns how many actions ran to completion.
    pub fn dispatch(&self, time: f64, delta: f64) -> Result<usize> {
        let mut ran = 0;
        for action in self.snapshot()? {
            let mut guard = match action.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    warn!("skipping timed action with poisoned lock");
                    continue;
                }
            };
            match catch_unwind(AssertUnwindSafe(|| guard.update(time, delta))) {
                Ok(()) => ran += 1,
                Err(_) => warn!(time, "timed action panicked"),
            }
        }
        Ok(ran)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RegistryInner>> {
        self.inner
            .lock()
            .map_err(|_| Error::LockPoisoned("action registry"))
    }
}

// ============================================================================
// Game Loop
// ============================================================================

/// Drives an [`ActionRegistry`] from one background thread at a fixed cadence.
pub struct GameLoop {
    config: LoopConfig,
    registry: ActionRegistry,
    stop_flag: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl GameLoop {
    pub fn new(config: LoopConfig) -> Self {
        Self::with_registry(config, ActionRegistry::new())
    }

    pub fn with_registry(config: LoopConfig, registry: ActionRegistry) -> Self {
        Self {
            config,
            registry,
            stop_flag: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            thread: None,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Handle for registering actions from any thread.
    pub fn registry(&self) -> ActionRegistry {
        self.registry.clone()
    }

    pub fn add_action<A: TimedAction + 'static>(&self, action: A) -> Result<ActionId> {
        self.registry.add(action)
    }

    pub fn add_shared(&self, action: SharedAction) -> Result<ActionId> {
        self.registry.add_shared(action)
    }

    pub fn remove_action(&self, id: ActionId) -> Result<bool> {
        self.registry.remove(id)
    }

    /// Ticks completed since the loop was created.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn the loop thread. Calling `start` on a running loop is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        // Reap a thread that exited on its own
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        let registry = self.registry.clone();
        let stop_flag = Arc::clone(&self.stop_flag);
        let ticks = Arc::clone(&self.ticks);
        let budget = self.config.tick_interval();

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_loop(registry, stop_flag, ticks, budget))?;

        debug!(
            thread = %self.config.thread_name,
            interval_ms = self.config.tick_interval_ms,
            "game loop started"
        );
        self.thread = Some(handle);
        Ok(())
    }

    /// Ask the loop to stop after the current tick and wait for it.
    ///
    /// Called from inside a timed action the flag is set but the thread is
    /// not joined, since it cannot wait for itself.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        let Some(handle) = self.thread.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("game loop thread panicked");
        }
        debug!(ticks = self.tick_count(), "game loop stopped");
    }
}

impl Drop for GameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    registry: ActionRegistry,
    stop_flag: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    budget: Duration,
) {
    let mut clock = TickClock::new(Instant::now());

    while !stop_flag.load(Ordering::SeqCst) {
        let tick_start = Instant::now();
        let (time, delta) = clock.sample(tick_start);

        match registry.dispatch(time, delta) {
            Ok(ran) => trace!(time, delta, ran, "tick"),
            Err(e) => warn!(error = %e, "tick dispatch failed"),
        }
        ticks.fetch_add(1, Ordering::AcqRel);

        let spent = tick_start.elapsed();
        match budget.checked_sub(spent) {
            Some(rest) if !rest.is_zero() => thread::sleep(rest),
            _ => debug!(spent_ms = spent.as_millis() as u64, "tick overran budget"),
        }
    }
}
