//! HTTP and WebSocket surface for the storyline orchestrator.

pub mod api;
pub mod metrics;
pub mod state;
