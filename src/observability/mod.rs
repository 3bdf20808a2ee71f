//! Observability support
//!
//! Structured logging setup for applications embedding the connection core.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};
