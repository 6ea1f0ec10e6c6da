//! HTTP server
//!
//! Router, handlers, admission control and the SSE stream controller.

pub mod admission;
pub mod app;
pub mod handlers;
pub mod stream;

pub use app::{AppState, create_app, create_app_with_providers};
