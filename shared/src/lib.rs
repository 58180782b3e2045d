//! Shared types and models for the Pocket Farm platform
//!
//! This crate contains the schedule engine, alert evaluation and wire types
//! shared between the backend, the client library, and the browser (via WASM).

pub mod alerts;
pub mod models;
pub mod schedule;
pub mod types;
pub mod validation;

pub use alerts::*;
pub use models::*;
pub use schedule::*;
pub use types::*;
pub use validation::*;
