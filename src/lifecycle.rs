// src/lifecycle.rs
//! SurfaceLifecycleController - reconciles host surface notifications with the simulation.
//!
//! The host calls the `on_surface_*` entry points from its own thread, at any
//! time relative to the simulation. The controller:
//! - starts a session (FrameBuffer + Presenter + SimulationRunner) on the
//!   first surface creation, and again only after a previous session stopped
//! - coalesces repeated creation notifications for the same surface
//! - guarantees that once `on_surface_destroyed` returns, nothing presents
//!   to that surface again
//! - tears the session down on `shutdown` (or drop)


use crate::config::Config;
use crate::display::{SurfaceDriver, SurfaceEvent, SurfaceHandle, SurfaceSlot};
use crate::error::{BridgeError, BridgeResult};
use crate::frame::{FrameBuffer, FrameDimensions};
use crate::pixel::FormatPair;
use crate::presenter::{PresentReport, Presenter, SharedPresenter};
use crate::simulation::{EngineHandle, FrameListener, RunnerState, SimulationRunner};
use log::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-session counters, updated from the simulation thread.
#[derive(Debug, Default)]
pub struct SessionStats {
    presented: AtomicU64,
    dropped: AtomicU64,
}

impl SessionStats {
    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    /// Frames that had no surface to go to, or failed to present.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record(&self, result: &BridgeResult<PresentReport>) {
        match result {
            Ok(_) => {
                self.presented.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub state: RunnerState,
    pub steps: u64,
    pub presented: u64,
    pub dropped: u64,
    pub last_sequence: u64,
}

/// Presents after every simulation step, swallowing per-frame failures.
struct PresentOnFrame {
    presenter: SharedPresenter,
    stats: Arc<SessionStats>,
}

impl FrameListener for PresentOnFrame {
    fn frame_ready(&mut self, frame_buffer: &FrameBuffer, sequence: u64) {
        let result = self.presenter.lock().present_frame(frame_buffer);
        match &result {
            Ok(report) => trace!("frame {} presented on {}", sequence, report.handle),
            Err(e) if e.is_recoverable() => trace!("frame {} dropped: {}", sequence, e),
            Err(e) => warn!("frame {} failed to present: {}", sequence, e),
        }
        self.stats.record(&result);
    }
}

/// One running simulation bound to one frame buffer.
struct SimulationSession {
    frame_buffer: Arc<FrameBuffer>,
    presenter: SharedPresenter,
    runner: SimulationRunner,
    stats: Arc<SessionStats>,
}

impl SimulationSession {
    fn summary(&self) -> SessionSummary {
        SessionSummary {
            state: self.runner.state(),
            steps: self.runner.steps(),
            presented: self.stats.presented(),
            dropped: self.stats.dropped(),
            last_sequence: self.frame_buffer.sequence(),
        }
    }
}

pub struct SurfaceLifecycleController {
    engine: EngineHandle,
    driver: Arc<dyn SurfaceDriver>,
    config: Config,
    pair: FormatPair,
    dims: FrameDimensions,
    slot: Arc<SurfaceSlot>,
    session: Mutex<Option<SimulationSession>>,
}

impl std::fmt::Debug for SurfaceLifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceLifecycleController")
            .field("engine", &self.engine)
            .field("pair", &self.pair)
            .field("dims", &self.dims)
            .field("surface", &self.slot.current())
            .finish()
    }
}

impl SurfaceLifecycleController {
    /// Validates `config` against the engine. Nothing starts until a surface arrives.
    pub fn new(
        engine: EngineHandle,
        driver: Arc<dyn SurfaceDriver>,
        config: Config,
    ) -> BridgeResult<Self> {
        let pair = config.validate(engine.native_format())?;
        let dims = config.simulation.dimensions()?;
        info!(
            "SurfaceLifecycleController: engine '{}', {}x{}, {:?} -> {:?}",
            engine.name(),
            dims.width(),
            dims.height(),
            pair.source,
            pair.target
        );
        Ok(Self {
            engine,
            driver,
            config,
            pair,
            dims,
            slot: Arc::new(SurfaceSlot::new()),
            session: Mutex::new(None),
        })
    }

    /// Routes a host notification to the matching entry point.
    pub fn handle_event(&self, event: SurfaceEvent) -> BridgeResult<()> {
        match event {
            SurfaceEvent::Created(handle) => self.on_surface_created(handle),
            SurfaceEvent::Changed {
                handle,
                width,
                height,
            } => self.on_surface_changed(handle, width, height),
            SurfaceEvent::Destroyed(handle) => {
                self.on_surface_destroyed(handle);
                Ok(())
            }
        }
    }

    /// A surface is ready. Starts a session unless one is already running.
    ///
    /// Fails with `EngineUnavailable` if the engine cannot be initialised; the
    /// failure is not retried until the next creation notification.
    pub fn on_surface_created(&self, handle: SurfaceHandle) -> BridgeResult<()> {
        let mut session = self.session.lock();
        if !self.slot.attach(handle) {
            debug!("SurfaceLifecycleController: duplicate create for {} ignored", handle);
            return Ok(());
        }

        if let Some(current) = session.as_ref() {
            if current.runner.state() == RunnerState::Running {
                info!(
                    "SurfaceLifecycleController: {} attached to running session",
                    handle
                );
                return Ok(());
            }
        }

        if let Some(mut finished) = session.take() {
            if let Err(e) = finished.runner.stop() {
                warn!("SurfaceLifecycleController: previous session ended with: {}", e);
            }
        }

        match self.start_session() {
            Ok(started) => {
                *session = Some(started);
                Ok(())
            }
            Err(e) => {
                error!("SurfaceLifecycleController: session failed to start: {}", e);
                Err(e)
            }
        }
    }

    /// The surface changed size. In-flight presentations finish first.
    pub fn on_surface_changed(&self, handle: SurfaceHandle, width: i32, height: i32) -> BridgeResult<()> {
        let size = FrameDimensions::new(width, height)?;
        self.slot.resize(handle, size);
        Ok(())
    }

    /// The surface is going away. Returns once no presentation can touch it.
    ///
    /// The simulation keeps running unless `lifecycle.stop_on_surface_destroyed` is set.
    pub fn on_surface_destroyed(&self, handle: SurfaceHandle) {
        if !self.slot.detach(handle) {
            return;
        }
        if self.config.lifecycle.stop_on_surface_destroyed {
            if let Some(session) = self.session.lock().as_ref() {
                session.runner.request_stop();
            }
        }
    }

    /// Presents the latest completed frame from the caller's thread.
    pub fn present_now(&self) -> BridgeResult<PresentReport> {
        let (presenter, frame_buffer, stats) = {
            let session = self.session.lock();
            let session = session
                .as_ref()
                .ok_or_else(|| BridgeError::InvalidState("no simulation session".to_string()))?;
            (
                Arc::clone(&session.presenter),
                Arc::clone(&session.frame_buffer),
                Arc::clone(&session.stats),
            )
        };
        let result = presenter.lock().present_frame(&frame_buffer);
        stats.record(&result);
        result
    }

    pub fn current_surface(&self) -> Option<SurfaceHandle> {
        self.slot.current()
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.session.lock().as_ref().map(SimulationSession::summary)
    }

    /// Waits up to `timeout` for the current session to stop on its own.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        let handle = self.session.lock().as_ref().map(|s| s.runner.stop_handle());
        handle.map_or(true, |h| h.wait_stopped(timeout))
    }

    /// Stops and joins the session. Returns how many steps it ran.
    pub fn shutdown(&self) -> BridgeResult<u64> {
        let Some(mut session) = self.session.lock().take() else {
            return Ok(0);
        };
        info!("SurfaceLifecycleController: shutting down session");
        let steps = session.runner.stop()?;
        info!(
            "SurfaceLifecycleController: session ended after {} steps ({} presented, {} dropped)",
            steps,
            session.stats.presented(),
            session.stats.dropped()
        );
        Ok(steps)
    }

    fn start_session(&self) -> BridgeResult<SimulationSession> {
        let frame_buffer = Arc::new(FrameBuffer::with_dimensions(
            self.dims,
            self.engine.native_format(),
        )?);
        let presenter = Presenter::new(
            Arc::clone(&self.driver),
            Arc::clone(&self.slot),
            self.pair,
            self.config.display.clear_color,
        )?
        .into_shared();
        let stats = Arc::new(SessionStats::default());

        let mut runner = SimulationRunner::new(self.config.simulation.runner_settings());
        runner.start(
            Arc::clone(&frame_buffer),
            &self.engine,
            Box::new(PresentOnFrame {
                presenter: Arc::clone(&presenter),
                stats: Arc::clone(&stats),
            }),
        )?;
        info!("SurfaceLifecycleController: session started");

        Ok(SimulationSession {
            frame_buffer,
            presenter,
            runner,
            stats,
        })
    }
}

impl Drop for SurfaceLifecycleController {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("SurfaceLifecycleController: shutdown on drop failed: {}", e);
        }
    }
}
