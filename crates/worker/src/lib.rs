//! Process wiring shared by the one-shot worker and the API server.
//!
//! [`WorkerConfig`] reads the environment; [`Engine::start`] turns it into
//! a running pipeline: persistence gateway, connected tool providers, hook
//! dispatcher and controller.

pub mod config;
pub mod engine;
pub mod logging;

pub use config::WorkerConfig;
pub use engine::Engine;
