//! Testing utilities and mock implementations
//!
//! Mock transport providers for exercising the connection manager without a
//! real network.

pub mod mocks;

pub use mocks::*;
