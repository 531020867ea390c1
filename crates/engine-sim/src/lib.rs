// Simulated native audio engine for yanap sessions
// Drives the engine side of a yanap-transport channel the way the native
// players behave, for tests and local development.

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::SimulatedEngine;
