// src/simulation/runner.rs
//! SimulationRunner - drives one engine instance on a dedicated thread.
//!
//! Each step renders straight into the FrameBuffer's back buffer, publishes
//! it, then tells the [`FrameListener`] a frame is ready. The thread never
//! waits for a display: if nothing can be shown the listener drops the frame.
//!
//! State machine: `Uninitialized -> Running -> StopRequested -> Stopped`.
//! A runner that has stopped cannot run again.
//!
//! Stop bound: after `request_stop` the thread finishes the step (and the
//! presentation) it is in, then exits. Pacing sleeps wake immediately. The
//! documented bound is the configured `stop_timeout`, which must exceed one
//! engine step plus one presentation.

use crate::error::{BridgeError, BridgeResult};
use crate::frame::FrameBuffer;
use crate::simulation::engine::{EngineHandle, SimulationEngine};
use log::*;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Receives a signal after every completed step.
pub trait FrameListener: Send {
    fn frame_ready(&mut self, frame_buffer: &FrameBuffer, sequence: u64);
}

impl<F> FrameListener for F
where
    F: FnMut(&FrameBuffer, u64) + Send,
{
    fn frame_ready(&mut self, frame_buffer: &FrameBuffer, sequence: u64) {
        (self)(frame_buffer, sequence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Uninitialized,
    Running,
    StopRequested,
    Stopped,
}

/// Timing knobs for one runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Time between step starts. `None` runs flat out.
    pub tick_interval: Option<Duration>,
    /// Stop on its own after this many steps.
    pub max_steps: Option<u64>,
    /// How long `stop` waits for the thread to wind down.
    pub stop_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Some(Duration::from_secs(1) / 35),
            max_steps: None,
            stop_timeout: Duration::from_millis(250),
        }
    }
}

struct Shared {
    state: Mutex<RunnerState>,
    changed: Condvar,
    steps: AtomicU64,
}

impl Shared {
    fn state(&self) -> RunnerState {
        *self.state.lock()
    }

    fn set_state(&self, next: RunnerState) {
        *self.state.lock() = next;
        self.changed.notify_all();
    }

    fn request_stop(&self) {
        let mut state = self.state.lock();
        match *state {
            RunnerState::Running => {
                info!("SimulationRunner: stop requested");
                *state = RunnerState::StopRequested;
            }
            // Never started; it can no longer be.
            RunnerState::Uninitialized => *state = RunnerState::Stopped,
            RunnerState::StopRequested | RunnerState::Stopped => {}
        }
        drop(state);
        self.changed.notify_all();
    }

    /// Sleeps until `deadline` unless a stop arrives first. Returns false on stop.
    fn pace_until(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while *state == RunnerState::Running {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        *state == RunnerState::Running
    }

    fn wait_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while *state != RunnerState::Stopped {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        *state == RunnerState::Stopped
    }
}

/// Cloneable stop trigger, usable from any thread.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }

    pub fn state(&self) -> RunnerState {
        self.shared.state()
    }

    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        self.shared.wait_stopped(timeout)
    }
}

pub struct SimulationRunner {
    settings: RunnerSettings,
    shared: Arc<Shared>,
    thread_handle: Option<JoinHandle<BridgeResult<u64>>>,
}

impl std::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("state", &self.state())
            .field("steps", &self.steps())
            .finish()
    }
}

impl SimulationRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self {
            settings,
            shared: Arc::new(Shared {
                state: Mutex::new(RunnerState::Uninitialized),
                changed: Condvar::new(),
                steps: AtomicU64::new(0),
            }),
            thread_handle: None,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.shared.state()
    }

    /// Steps completed so far.
    pub fn steps(&self) -> u64 {
        self.shared.steps.load(Ordering::Acquire)
    }

    /// The documented time from `request_stop` to `Stopped`.
    pub fn stop_bound(&self) -> Duration {
        self.settings.stop_timeout
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Initialises the engine and spawns the simulation thread.
    ///
    /// Fails with `EngineUnavailable` (no thread is created) if the engine
    /// cannot be initialised, `UnsupportedFormat` if its native format does
    /// not match `frame_buffer`, and `InvalidState` unless the runner is
    /// still `Uninitialized`.
    pub fn start(
        &mut self,
        frame_buffer: Arc<FrameBuffer>,
        engine: &EngineHandle,
        listener: Box<dyn FrameListener>,
    ) -> BridgeResult<()> {
        let state = self.state();
        if state != RunnerState::Uninitialized {
            return Err(BridgeError::InvalidState(format!(
                "cannot start a runner in state {state:?}"
            )));
        }
        if engine.native_format() != frame_buffer.format() {
            return Err(BridgeError::UnsupportedFormat {
                from: engine.native_format(),
                to: frame_buffer.format(),
            });
        }

        let instance = engine.initialize().map_err(|e| match e {
            BridgeError::EngineUnavailable(_) => e,
            other => BridgeError::EngineUnavailable(other.to_string()),
        })?;
        info!("SimulationRunner: engine '{}' initialised", engine.name());

        // A stop may have arrived while the engine was initialising.
        // Running is set before the thread exists so a later request_stop is not lost.
        {
            let mut state = self.shared.state.lock();
            if *state != RunnerState::Uninitialized {
                let current = *state;
                drop(state);
                drop(instance);
                warn!("SimulationRunner: stopped during start ({:?})", current);
                return Err(BridgeError::InvalidState(format!(
                    "runner left Uninitialized during start ({current:?})"
                )));
            }
            *state = RunnerState::Running;
        }
        self.shared.changed.notify_all();

        let shared = Arc::clone(&self.shared);
        let settings = self.settings;
        let spawned = thread::Builder::new()
            .name("simulation".to_string())
            .spawn(move || run(shared, settings, instance, frame_buffer, listener));

        match spawned {
            Ok(handle) => {
                self.thread_handle = Some(handle);
                info!("SimulationRunner: thread spawned");
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(RunnerState::Stopped);
                Err(BridgeError::InvalidState(format!(
                    "failed to spawn simulation thread: {e}"
                )))
            }
        }
    }

    /// Asks the thread to stop after its current step. Never blocks on the thread.
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }

    /// Waits up to `timeout` for `Stopped`. Returns whether it got there.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        self.shared.wait_stopped(timeout)
    }

    /// Requests a stop, waits up to the stop bound, and joins the thread.
    ///
    /// Returns the number of steps the session ran, or the engine error that ended it.
    pub fn stop(&mut self) -> BridgeResult<u64> {
        self.request_stop();
        if !self.wait_stopped(self.settings.stop_timeout) {
            warn!(
                "SimulationRunner: not stopped within {:?}",
                self.settings.stop_timeout
            );
            return Err(BridgeError::InvalidState(format!(
                "runner did not stop within {:?}",
                self.settings.stop_timeout
            )));
        }
        match self.thread_handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                error!("SimulationRunner: thread panicked");
                Err(BridgeError::InvalidState(
                    "simulation thread panicked".to_string(),
                ))
            }),
            None => Ok(self.steps()),
        }
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        if self.thread_handle.is_none() {
            return;
        }
        debug!("SimulationRunner dropped");
        match self.stop() {
            Ok(steps) => debug!("SimulationRunner: joined after {} steps", steps),
            Err(e) if self.thread_handle.is_some() => {
                warn!("SimulationRunner: detaching thread: {}", e)
            }
            Err(e) => debug!("SimulationRunner: session ended with: {}", e),
        }
    }
}

fn run(
    shared: Arc<Shared>,
    settings: RunnerSettings,
    mut engine: Box<dyn SimulationEngine>,
    frame_buffer: Arc<FrameBuffer>,
    mut listener: Box<dyn FrameListener>,
) -> BridgeResult<u64> {
    info!("SimulationRunner: thread started");
    let _stopped = MarkStoppedOnExit(Arc::clone(&shared));
    let dims = frame_buffer.dimensions();
    let mut steps = 0u64;
    let mut next_tick = Instant::now();

    let result = loop {
        if shared.state() != RunnerState::Running {
            break Ok(steps);
        }
        if settings.max_steps.is_some_and(|max| steps >= max) {
            info!("SimulationRunner: step budget of {} reached", steps);
            break Ok(steps);
        }

        let stepped = frame_buffer.write_with(|buf| {
            engine.step(buf, dims).map_err(|e| match e {
                BridgeError::Engine(_) => e,
                other => BridgeError::Engine(other.to_string()),
            })
        });
        let sequence = match stepped {
            Ok(seq) => seq,
            Err(e) => {
                error!("SimulationRunner: engine step failed: {}", e);
                break Err(e);
            }
        };
        steps += 1;
        shared.steps.store(steps, Ordering::Release);
        trace!("SimulationRunner: step {} -> frame {}", steps, sequence);

        listener.frame_ready(&frame_buffer, sequence);

        if let Some(interval) = settings.tick_interval {
            next_tick += interval;
            let now = Instant::now();
            if next_tick < now {
                // Fell behind; don't try to catch up with a burst of steps.
                next_tick = now;
            }
            if !shared.pace_until(next_tick) {
                break Ok(steps);
            }
        }
    };

    info!("SimulationRunner: thread stopped after {} steps", steps);
    result
}

/// Publishes `Stopped` when the simulation thread exits, including by panic.
struct MarkStoppedOnExit(Arc<Shared>);

impl Drop for MarkStoppedOnExit {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("SimulationRunner: simulation thread panicked");
        }
        self.0.set_state(RunnerState::Stopped);
    }
}
