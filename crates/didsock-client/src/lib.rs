#![deny(unsafe_code)]

//! didsock client core — HTTP/JSON exchanges with the local DID agent.
//!
//! The agent is a background daemon that owns the hard parts (DID
//! resolution, DIDComm encryption, verifiable-credential signing, binary
//! updates). This crate is the caller side: it resolves a transport once at
//! startup, performs one blocking-style exchange at a time, and normalizes
//! the outcome.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐        Unix socket / loopback TCP        ┌──────────────┐
//! │   CLI    │─────────────────────────────────────────▶│  DID agent   │
//! │ (caller) │  HTTP/1.1 + JSON                         │  (external)  │
//! └──────────┘                                          └──────────────┘
//! ```
//!
//! The transport is chosen once per process: a Unix domain socket on POSIX
//! platforms, a loopback TCP port elsewhere (see [`platform::is_windows`]).

/// Agent client and outcome normalization.
pub mod client;
/// Platform detection for transport selection.
pub mod platform;
/// Transport resolution — Unix domain socket or loopback TCP.
pub mod transport;
/// Typed payloads for the agent's HTTP API.
pub mod types;

pub use client::{AgentClient, AgentReply, ClientError, decode_reply};
pub use transport::{Transport, TransportError, TransportMode, TransportSettings};
