// src/simulation.rs
//! The simulation side of the bridge: engine collaborator and the thread that drives it.

pub mod engine;
pub mod runner;


pub use engine::{EngineHandle, EngineLibrary, PatternEngine, PatternLibrary, SimulationEngine};
pub use runner::{FrameListener, RunnerSettings, RunnerState, SimulationRunner, StopHandle};
