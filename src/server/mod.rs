//! HTTP boundary for the task router.
//!
//! # Endpoints
//!
//! - `POST /run?task=...`  - Route a plain-English task and execute it
//! - `GET  /read?path=...` - Read a file under the data root
//! - `GET  /health`        - Liveness check

pub mod routes;

pub use routes::{app_router, AppState};
