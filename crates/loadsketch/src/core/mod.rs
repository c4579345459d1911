//! Core abstractions for diagram editing
//!
//! This module defines the data model shared by every editor component:
//! node and edge records, metrics, geometry, configuration, errors, and the
//! read-only graph view used by analysis passes.

mod config;
mod database;
mod error;
pub mod logging;
mod metrics;
mod types;

pub use config::*;
pub use database::*;
pub use error::*;
pub use logging::*;
pub use metrics::*;
pub use types::*;
