//! # Adasim Server
//!
//! HTTP server for the adasim driving-simulation platform.
//!
//! ## Overview
//!
//! - **Ingestion**: hands a run's stored asset to the external detector,
//!   persists the resulting sensor samples and alerts, correlates alerts
//!   to the observations that caused them, and commits the run's final
//!   state
//! - **Real-time events**: pushes per-owner alert and run-status events
//!   to connected WebSocket sessions
//! - **Streaming**: serves processed run videos with HTTP byte-range
//!   support for seeking playback
//!
//! ## Architecture
//!
//! The server is built on Axum and uses:
//! - PostgreSQL for persistent storage
//! - An external detector microservice over HTTP
//! - Per-owner broadcast channels for event fan-out

pub mod errors;
pub mod handlers;
pub mod infra;
pub mod middleware;
pub mod routes;
pub mod websocket;

pub use errors::{AppError, AppResult};
pub use infra::app_state::AppState;
