#![deny(unsafe_code)]

//! Shared test utilities for the didsock workspace.
//!
//! Provides the mock agent daemon, config builders, and tracing helpers so
//! that individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! didsock-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod mock_agent;
pub mod tracing_setup;

pub use mock_agent::MockAgent;
