#![doc = include_str!("../docs/rustdoc.md")]

/// Mount/unmount adapter with reactive connection state.
pub mod binding;
/// Command-line argument definitions.
pub mod cli;
/// Signal stream client: lifecycle, liveness and reconnection.
pub mod client;
/// Connection state owned by one client.
pub mod client_state;
/// Connection and application configuration.
pub mod config;
/// Error types used across the crate.
pub mod error;
/// Event bus messages between client callbacks and UI.
pub mod events;
/// Terminal output formatters.
pub mod formatter;
/// Metrics counters and exporter setup.
pub mod monitoring;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Stream-opening primitives (SSE, WebSocket).
pub mod transport;
/// Signal message data model.
pub mod types;
/// UI controller and presentation loop.
pub mod ui;

/// Primary crate error type.
pub use error::SignalError;
pub use binding::SignalBinding;
pub use client::SignalStreamClient;
pub use config::ConnectionConfig;
pub use types::{SignalBody, SignalKind, SignalMessage};
