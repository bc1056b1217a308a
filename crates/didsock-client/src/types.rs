//! Typed payloads for the agent's HTTP API.
//!
//! These mirror the JSON bodies the agent accepts and produces. Responses
//! that carry DID documents, DIDComm envelopes, or verifiable credentials
//! are opaque to this crate and stay as raw `serde_json::Value`s — the
//! agent owns those formats.

use serde::{Deserialize, Serialize};

/// A device event. POST `/events` accepts a single event or a batch array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub key: String,
    pub detail: String,
    /// Seconds since the Unix epoch.
    pub occurred_at: u64,
}

/// A numeric metric sample. POST `/custom_metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMetric {
    pub key: String,
    pub value: f64,
    /// Seconds since the Unix epoch, as a decimal string — the agent
    /// parses this field itself.
    pub occurred_at: String,
}

/// A log line forwarded to the agent. POST `/logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub occurred_at: u64,
}

/// Payload for DIDComm and verifiable-message creation.
///
/// `message` is an opaque JSON string; the agent encrypts or signs it
/// as-is and stamps the exchange with `operation_tag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub destination_did: String,
    pub message: String,
    pub operation_tag: String,
}

/// Payload for DIDComm and verifiable-message verification. `message` is
/// the serialized envelope produced by the corresponding create call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub message: String,
}

/// POST `/internal/version/update` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionUpdate {
    pub message: VersionUpdateTarget,
}

/// Where to fetch the new agent binary and where to unpack it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionUpdateTarget {
    pub binary_url: String,
    pub path: String,
}

impl VersionUpdate {
    pub fn new(binary_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: VersionUpdateTarget {
                binary_url: binary_url.into(),
                path: path.into(),
            },
        }
    }
}

/// GET `/internal/version/get` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}
