//! Timed replay of a trace with pause, resume and cancel.
//!
//! A run is a tokio task driving an explicit phase machine:
//!
//! ```text
//! Playing <-> Paused
//! Playing | Paused -> Cancelled
//! Playing -> Completed
//! ```
//!
//! Terminal phases are absorbing; control calls on a finished run do nothing.
//! The wait between steps races a `tokio::time::sleep` against phase changes,
//! so `cancel` preempts a pending delay instead of letting it expire. Sink
//! calls and the cancel transition take the same gate: once
//! [`PlaybackHandle::cancel`] returns, no `on_step` or `on_complete` call
//! starts for that run. A sink may cancel its own run from inside a
//! callback; the task re-reads the phase before every dispatch.
//!
//! If a sink panics the task ends and the run is marked `Cancelled`, so
//! [`PlaybackHandle::wait`] still resolves.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use algotrace_core::{Step, Trace, TraceResult};

use crate::projector::VisualState;

/// Default pause between two steps.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Wait between consecutive steps.
    pub delay: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            delay: DEFAULT_DELAY,
        }
    }
}

/// Receives the steps of a run as they are dispatched.
///
/// Both callbacks run on the playback task while the run's gate is held.
/// Any control call on the run, including [`PlaybackHandle::cancel`], may be
/// made from inside a callback.
pub trait PlaybackSink: Send + 'static {
    /// Step `index` was dispatched; `state` already includes its effect.
    fn on_step(&mut self, index: usize, step: &Step, state: &VisualState);

    /// Every step was dispatched.
    fn on_complete(&mut self, result: &TraceResult);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Playing,
    Paused,
    Completed,
    Cancelled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Cancelled)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
}

/// Unique identifier of one playback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

thread_local! {
    /// Run whose sink callback is executing on this thread, if any.
    static DISPATCHING: Cell<Option<RunId>> = const { Cell::new(None) };
}

/// Marks the current thread as inside a sink callback of one run.
/// Restores the previous marker on drop, including during unwinding.
struct Dispatching {
    previous: Option<RunId>,
}

impl Dispatching {
    fn enter(run: RunId) -> Self {
        Dispatching {
            previous: DISPATCHING.with(|d| d.replace(Some(run))),
        }
    }

    fn is_active(run: RunId) -> bool {
        DISPATCHING.with(|d| d.get()) == Some(run)
    }
}

impl Drop for Dispatching {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(self.previous));
    }
}

/// Ends the run as `Cancelled` if the playback task stops without reaching a
/// terminal phase: a sink panicked or the runtime shut down mid-run.
struct Finisher {
    shared: Arc<Shared>,
}

impl Drop for Finisher {
    fn drop(&mut self) {
        if self.shared.transition(|p| !p.is_terminal(), Phase::Cancelled) {
            tracing::warn!(
                run = %self.shared.run_id,
                position = self.shared.position.load(Ordering::Acquire),
                "playback task stopped early, run cancelled"
            );
        }
    }
}

/// State shared between a handle and its playback task.
struct Shared {
    run_id: RunId,
    phase: watch::Sender<Phase>,
    delay: watch::Sender<Duration>,
    /// Serializes sink calls against the cancel transition.
    gate: Mutex<()>,
    /// Number of steps dispatched so far.
    position: AtomicUsize,
}

impl Shared {
    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        // A sink that panicked poisons the gate; the unit payload is still fine.
        self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Moves to `to` when the current phase satisfies `from`. Returns whether it did.
    fn transition(&self, from: impl Fn(Phase) -> bool, to: Phase) -> bool {
        let mut previous = None;
        let changed = self.phase.send_if_modified(|phase| {
            if from(*phase) {
                previous = Some(*phase);
                *phase = to;
                true
            } else {
                false
            }
        });
        if let Some(previous) = previous {
            tracing::debug!(run = %self.run_id, from = ?previous, to = ?to, "playback transition");
        }
        changed
    }
}

/// Control surface of one run. Clones control the same run.
#[derive(Clone)]
pub struct PlaybackHandle {
    shared: Arc<Shared>,
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("run_id", &self.shared.run_id)
            .field("phase", &self.shared.phase())
            .field("position", &self.position())
            .finish()
    }
}

impl PlaybackHandle {
    /// Starts replaying `trace` on a new tokio task. Must be called inside a runtime.
    fn spawn<S>(trace: Arc<Trace>, config: PlaybackConfig, sink: S) -> Self
    where
        S: PlaybackSink,
    {
        let (phase, _) = watch::channel(Phase::Playing);
        let (delay, _) = watch::channel(config.delay);
        let shared = Arc::new(Shared {
            run_id: RunId::new(),
            phase,
            delay,
            gate: Mutex::new(()),
            position: AtomicUsize::new(0),
        });
        tracing::info!(
            run = %shared.run_id,
            steps = trace.len(),
            delay_ms = config.delay.as_millis() as u64,
            "playback started"
        );
        tokio::spawn(drive(Arc::clone(&shared), trace, sink));
        PlaybackHandle { shared }
    }

    pub fn run_id(&self) -> RunId {
        self.shared.run_id
    }

    pub fn status(&self) -> Phase {
        self.shared.phase()
    }

    /// Number of steps already handed to the sink.
    pub fn position(&self) -> usize {
        self.shared.position.load(Ordering::Acquire)
    }

    /// Holds the run before its next step. Dispatched steps stay dispatched.
    pub fn pause(&self) {
        self.shared.transition(|p| p == Phase::Playing, Phase::Paused);
    }

    /// Continues from the next undispatched step.
    pub fn resume(&self) {
        self.shared.transition(|p| p == Phase::Paused, Phase::Playing);
    }

    /// Stops the run for good. No sink call starts after this returns.
    ///
    /// Called from inside this run's own sink callback, the gate is already
    /// held by the caller, so only the phase changes; the callback in
    /// progress is the last one.
    pub fn cancel(&self) {
        let _gate = if Dispatching::is_active(self.shared.run_id) {
            None
        } else {
            Some(self.shared.lock_gate())
        };
        if self.shared.transition(|p| !p.is_terminal(), Phase::Cancelled) {
            tracing::info!(
                run = %self.shared.run_id,
                position = self.position(),
                "playback cancelled"
            );
        }
    }

    /// Changes the wait used after the next dispatched step.
    pub fn set_delay(&self, delay: Duration) {
        self.shared.delay.send_replace(delay);
    }

    pub fn delay(&self) -> Duration {
        *self.shared.delay.borrow()
    }

    /// Resolves once the run reaches a terminal phase.
    pub async fn wait(&self) -> PlaybackOutcome {
        let mut rx = self.shared.phase.subscribe();
        let phase = match rx.wait_for(|p| p.is_terminal()).await {
            Ok(phase) => *phase,
            Err(_) => Phase::Cancelled,
        };
        match phase {
            Phase::Completed => PlaybackOutcome::Completed,
            _ => PlaybackOutcome::Cancelled,
        }
    }
}

/// Blocks while paused. Returns false once the run is cancelled.
async fn wait_until_playing(rx: &mut watch::Receiver<Phase>) -> bool {
    match rx.wait_for(|p| *p != Phase::Paused).await {
        Ok(phase) => *phase == Phase::Playing,
        Err(_) => false,
    }
}

/// Sleeps for `delay` unless the run is cancelled first. Returns false on cancel.
async fn pause_between_steps(rx: &mut watch::Receiver<Phase>, delay: Duration) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            changed = rx.changed() => {
                if changed.is_err() || *rx.borrow_and_update() == Phase::Cancelled {
                    return false;
                }
            }
        }
    }
}

async fn drive<S: PlaybackSink>(shared: Arc<Shared>, trace: Arc<Trace>, mut sink: S) {
    let _finisher = Finisher {
        shared: Arc::clone(&shared),
    };
    let mut rx = shared.phase.subscribe();
    let mut state = VisualState::new();
    let last = trace.len().saturating_sub(1);

    for (index, step) in trace.steps().iter().enumerate() {
        state.apply(step);
        // The phase is re-read under the gate: a pause that lands after the
        // wait still holds this step back.
        loop {
            if !wait_until_playing(&mut rx).await {
                return;
            }
            let _gate = shared.lock_gate();
            match shared.phase() {
                Phase::Playing => {
                    let _dispatching = Dispatching::enter(shared.run_id);
                    sink.on_step(index, step, &state);
                    shared.position.store(index + 1, Ordering::Release);
                    break;
                }
                Phase::Paused => continue,
                Phase::Completed | Phase::Cancelled => return,
            }
        }
        if index < last {
            // Sampled after dispatch so a new delay applies from the next step on.
            let delay = *shared.delay.borrow();
            if !pause_between_steps(&mut rx, delay).await {
                return;
            }
        }
    }

    loop {
        if !wait_until_playing(&mut rx).await {
            return;
        }
        let _gate = shared.lock_gate();
        match shared.phase() {
            Phase::Playing => {
                let _dispatching = Dispatching::enter(shared.run_id);
                sink.on_complete(trace.result());
                shared.transition(|p| p == Phase::Playing, Phase::Completed);
                break;
            }
            Phase::Paused => continue,
            Phase::Completed | Phase::Cancelled => return,
        }
    }
    tracing::info!(run = %shared.run_id, steps = trace.len(), "playback completed");
}

/// Owns the active run and applies the cancel-and-replace policy.
///
/// Starting a new run always cancels the previous one first, so at most one
/// run per controller delivers to a sink at any time.
#[derive(Debug, Default)]
pub struct PlaybackController {
    current: Option<PlaybackHandle>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any active run, then starts replaying `trace` into `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn play<S>(
        &mut self,
        trace: impl Into<Arc<Trace>>,
        config: PlaybackConfig,
        sink: S,
    ) -> PlaybackHandle
    where
        S: PlaybackSink,
    {
        if let Some(previous) = self.current.take() {
            if !previous.status().is_terminal() {
                tracing::warn!(run = %previous.run_id(), "replacing active playback run");
                previous.cancel();
            }
        }
        let handle = PlaybackHandle::spawn(trace.into(), config, sink);
        self.current = Some(handle.clone());
        handle
    }

    /// Handle of the most recently started run.
    pub fn current(&self) -> Option<&PlaybackHandle> {
        self.current.as_ref()
    }

    /// Cancels the active run, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }
}
