//! Sheetcalc API Server module
//!
//! HTTP REST API over the calculation and merge engine.
//! Run with `sheetcalc-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, ApiConfig, AppState};
