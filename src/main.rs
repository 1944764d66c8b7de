// In src/main.rs

use surface_bridge::{
    config::Config,
    display::{HeadlessSurfaceDriver, SurfaceDriver},
    simulation::EngineHandle,
    SurfaceLifecycleController,
};

// Logging
use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

// Surface the headless host creates first, then rotates to portrait.
const LANDSCAPE: (u32, u32) = (1280, 800);
const PORTRAIT: (u32, u32) = (800, 1280);
const PHASE: Duration = Duration::from_millis(500);

/// Plays the host's part: creates, resizes, destroys and recreates a surface
/// while the simulation runs, then shuts the session down.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting surface-bridge...");

    let config = Config::load_or_default().context("Failed to load configuration")?;
    let engine = EngineHandle::locate(&config.simulation.engine)
        .context("Failed to locate simulation engine")?;

    let driver = Arc::new(HeadlessSurfaceDriver::new(config.display.target_format));
    let controller = SurfaceLifecycleController::new(
        engine,
        driver.clone() as Arc<dyn SurfaceDriver>,
        config,
    )
    .context("Invalid configuration")?;

    // --- First surface ---
    let surface = driver.create_surface(LANDSCAPE.0, LANDSCAPE.1);
    controller
        .on_surface_created(surface)
        .context("Failed to start simulation session")?;
    controller.on_surface_changed(surface, LANDSCAPE.0 as i32, LANDSCAPE.1 as i32)?;
    sleep(PHASE);

    // --- Rotation ---
    driver.resize_surface(surface, PORTRAIT.0, PORTRAIT.1)?;
    controller.on_surface_changed(surface, PORTRAIT.0 as i32, PORTRAIT.1 as i32)?;
    sleep(PHASE);
    info!("Frames posted to {}: {}", surface, driver.post_count(surface));

    // --- Backgrounded: no surface, frames are dropped ---
    controller.on_surface_destroyed(surface);
    driver.destroy_surface(surface);
    sleep(PHASE / 2);

    // --- Foregrounded again ---
    let surface = driver.create_surface(LANDSCAPE.0, LANDSCAPE.1);
    controller.on_surface_created(surface)?;
    sleep(PHASE);
    info!("Frames posted to {}: {}", surface, driver.post_count(surface));

    match controller.summary() {
        Some(summary) => info!(
            "Session: {:?}, {} steps, {} presented, {} dropped",
            summary.state, summary.steps, summary.presented, summary.dropped
        ),
        None => warn!("No simulation session was running"),
    }

    controller.on_surface_destroyed(surface);
    let steps = controller.shutdown().context("Failed to stop simulation")?;
    info!("surface-bridge exited after {} steps.", steps);

    Ok(())
}
