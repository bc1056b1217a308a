//! Agent client — one request/response exchange at a time with the local
//! DID agent, with the outcome normalized.
//!
//! Only GET and POST exist on the agent's API. A 200-class response is
//! decoded as JSON, a 204 becomes [`AgentReply::NoContent`], and any other
//! status is surfaced as a structured [`ClientError::Api`] carrying the
//! status, reason phrase, and body text — never swallowed, never a process
//! exit. Callers decide what to do with failures.

use std::fmt;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use serde_json::Value;
use tracing::debug;

use didsock_config::AgentConfig;

use crate::transport::{Transport, TransportError, TransportSettings};
use crate::types::{
    CustomMetric, Event, LogMessage, MessageEnvelope, VerifyRequest, VersionInfo, VersionUpdate,
};

/// Errors from the agent client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unsupported method: {0} (the agent API is GET/POST only)")]
    UnsupportedMethod(String),

    #[error("failed to serialize payload: {0}")]
    Serialize(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("agent returned {status} {reason}: {body}")]
    Api {
        status: u16,
        reason: String,
        body: String,
    },
}

/// Outcome of a successful exchange with the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    /// A JSON body from a 200-class response.
    Json(Value),
    /// A 204 response — the agent accepted the request and said nothing.
    NoContent,
}

impl AgentReply {
    /// The JSON value, if this reply carried one.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::NoContent => None,
        }
    }
}

impl fmt::Display for AgentReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => {
                let pretty = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                f.write_str(&pretty)
            }
            Self::NoContent => f.write_str("no content"),
        }
    }
}

/// Normalize an HTTP status and body into a reply or a structured failure.
///
/// A 204 never touches the body. Other success statuses decode the body as
/// JSON. Everything else becomes [`ClientError::Api`] with the body text
/// unmodified.
pub fn decode_reply(status: StatusCode, body: &[u8]) -> Result<AgentReply, ClientError> {
    if status == StatusCode::NO_CONTENT {
        return Ok(AgentReply::NoContent);
    }
    if status.is_success() {
        let value = serde_json::from_slice(body)
            .map_err(|e| ClientError::Parse(format!("invalid JSON in {status} response: {e}")))?;
        return Ok(AgentReply::Json(value));
    }
    Err(ClientError::Api {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

/// Client for the local DID agent.
///
/// Holds the transport resolved once at construction. Exactly one request
/// is in flight at a time; each exchange opens its own scoped connection,
/// released when the exchange ends on any path.
pub struct AgentClient {
    transport: Transport,
}

impl AgentClient {
    /// Create a client over an already-resolved transport.
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Resolve the transport from configuration and environment, then
    /// build a client. Fails before any network I/O when required
    /// configuration (the TCP port) is missing.
    pub fn from_config(config: &AgentConfig) -> Result<Self, ClientError> {
        let settings = TransportSettings::from_config(config)?;
        Ok(Self::new(Transport::resolve(&settings)?))
    }

    /// The resolved transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Perform one GET exchange. GET requests carry no body.
    pub async fn get(&self, path: &str) -> Result<AgentReply, ClientError> {
        self.call("get", path, None).await
    }

    /// Perform one POST exchange. A `None` payload posts the empty object.
    pub async fn post(
        &self,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<AgentReply, ClientError> {
        self.call("post", path, payload).await
    }

    /// Low-level entry: validate the method, open a scoped connection,
    /// send, and normalize the outcome.
    ///
    /// An unsupported method is a caller bug and fails before any
    /// connection is attempted.
    pub async fn call(
        &self,
        method: &str,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<AgentReply, ClientError> {
        let method = match method.to_ascii_lowercase().as_str() {
            "get" => Method::GET,
            "post" => Method::POST,
            other => return Err(ClientError::UnsupportedMethod(other.to_string())),
        };

        debug!(method = %method, target = %self.transport.target(), path, "agent request");

        let body = if method == Method::GET {
            Full::new(Bytes::new())
        } else {
            match payload {
                Some(value) => {
                    let bytes = serde_json::to_vec(value)
                        .map_err(|e| ClientError::Serialize(e.to_string()))?;
                    Full::new(Bytes::from(bytes))
                }
                None => Full::new(Bytes::from_static(b"{}")),
            }
        };

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(path)
            .header("host", "localhost");

        if method == Method::POST {
            builder = builder.header("content-type", "application/json");
        }

        let req = builder
            .body(body)
            .map_err(|e| ClientError::Request(format!("failed to build request: {e}")))?;

        let mut sender = self.transport.handshake().await?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| ClientError::Request(format!("request failed: {e}")))?;

        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Request(format!("failed to read response body: {e}")))?
            .to_bytes();

        decode_reply(status, &bytes)
    }

    // ── Typed API methods ──────────────────────────────────────────────

    /// Create a new DID for this device. POST `/identifiers`.
    pub async fn create_identifier(&self) -> Result<Value, ClientError> {
        require_json(self.post("/identifiers", None).await?, "create_identifier")
    }

    /// Resolve a DID document. GET `/identifiers/{did}`.
    pub async fn find_identifier(&self, did: &str) -> Result<Value, ClientError> {
        require_json(
            self.get(&format!("/identifiers/{did}")).await?,
            "find_identifier",
        )
    }

    /// Post a single event. POST `/events`; the agent answers 204.
    pub async fn send_event(&self, event: &Event) -> Result<AgentReply, ClientError> {
        self.post("/events", Some(&to_value(event)?)).await
    }

    /// Post a batch of events in one call. POST `/events`.
    pub async fn send_events(&self, events: &[Event]) -> Result<AgentReply, ClientError> {
        self.post("/events", Some(&to_value(events)?)).await
    }

    /// Post a custom metric sample. POST `/custom_metrics`.
    pub async fn send_custom_metric(
        &self,
        metric: &CustomMetric,
    ) -> Result<AgentReply, ClientError> {
        self.post("/custom_metrics", Some(&to_value(metric)?)).await
    }

    /// Forward a log line. POST `/logs`.
    pub async fn send_log(&self, log: &LogMessage) -> Result<AgentReply, ClientError> {
        self.post("/logs", Some(&to_value(log)?)).await
    }

    /// Wrap a message as an encrypted DIDComm message addressed to
    /// `envelope.destination_did`. POST `/create-didcomm-message`.
    pub async fn create_didcomm_message(
        &self,
        envelope: &MessageEnvelope,
    ) -> Result<Value, ClientError> {
        require_json(
            self.post("/create-didcomm-message", Some(&to_value(envelope)?))
                .await?,
            "create_didcomm_message",
        )
    }

    /// Decrypt and verify a DIDComm message. POST `/verify-didcomm-message`.
    pub async fn verify_didcomm_message(
        &self,
        request: &VerifyRequest,
    ) -> Result<Value, ClientError> {
        require_json(
            self.post("/verify-didcomm-message", Some(&to_value(request)?))
                .await?,
            "verify_didcomm_message",
        )
    }

    /// Wrap a message as a signed verifiable credential. POST
    /// `/create-verifiable-message`.
    pub async fn create_verifiable_message(
        &self,
        envelope: &MessageEnvelope,
    ) -> Result<Value, ClientError> {
        require_json(
            self.post("/create-verifiable-message", Some(&to_value(envelope)?))
                .await?,
            "create_verifiable_message",
        )
    }

    /// Verify a signed verifiable credential. POST
    /// `/verify-verifiable-message`.
    pub async fn verify_verifiable_message(
        &self,
        request: &VerifyRequest,
    ) -> Result<Value, ClientError> {
        require_json(
            self.post("/verify-verifiable-message", Some(&to_value(request)?))
                .await?,
            "verify_verifiable_message",
        )
    }

    /// Ask the agent for its version. GET `/internal/version/get`.
    pub async fn version_get(&self) -> Result<VersionInfo, ClientError> {
        let value = require_json(self.get("/internal/version/get").await?, "version_get")?;
        serde_json::from_value(value).map_err(|e| ClientError::Parse(format!("version_get: {e}")))
    }

    /// Trigger a remote binary update. POST `/internal/version/update`.
    pub async fn version_update(
        &self,
        update: &VersionUpdate,
    ) -> Result<AgentReply, ClientError> {
        self.post("/internal/version/update", Some(&to_value(update)?))
            .await
    }
}

fn to_value<T: serde::Serialize + ?Sized>(payload: &T) -> Result<Value, ClientError> {
    serde_json::to_value(payload).map_err(|e| ClientError::Serialize(e.to_string()))
}

fn require_json(reply: AgentReply, context: &str) -> Result<Value, ClientError> {
    match reply {
        AgentReply::Json(value) => Ok(value),
        AgentReply::NoContent => Err(ClientError::Parse(format!(
            "{context}: agent returned no content where a body was expected"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_200_json() {
        let reply = decode_reply(StatusCode::OK, br#"{"a":1}"#).unwrap();
        assert_eq!(reply, AgentReply::Json(json!({"a": 1})));
    }

    #[test]
    fn test_decode_200_whitespace_independent() {
        let compact = decode_reply(StatusCode::OK, br#"{"a":1}"#).unwrap();
        let pretty = decode_reply(StatusCode::OK, b"{\n    \"a\": 1\n}").unwrap();
        assert_eq!(compact, pretty);
    }

    #[test]
    fn test_decode_204_never_parses_body() {
        // A 204 with a (nonsensical) body must still yield the sentinel.
        let reply = decode_reply(StatusCode::NO_CONTENT, b"not json at all").unwrap();
        assert_eq!(reply, AgentReply::NoContent);
        assert_eq!(reply.to_string(), "no content");
    }

    #[test]
    fn test_decode_failure_keeps_status_and_body() {
        for raw in [400u16, 404, 500] {
            let status = StatusCode::from_u16(raw).unwrap();
            let err = decode_reply(status, b"the original body").unwrap_err();
            match err {
                ClientError::Api {
                    status,
                    reason,
                    body,
                } => {
                    assert_eq!(status, raw);
                    assert!(!reason.is_empty());
                    assert_eq!(body, "the original body");
                }
                other => panic!("expected Api error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_200_invalid_json_is_parse_error() {
        let err = decode_reply(StatusCode::OK, b"<html>").unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
    }

    #[test]
    fn test_reply_display_pretty_prints() {
        let reply = AgentReply::Json(json!({"version": "3.3.0"}));
        assert_eq!(reply.to_string(), "{\n  \"version\": \"3.3.0\"\n}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unsupported_method_fails_without_connecting() {
        // The socket does not exist; a connection attempt would surface
        // NotRunning, so getting UnsupportedMethod proves we failed first.
        let client = AgentClient::new(Transport::Unix {
            socket_path: "/tmp/nonexistent-didsock.sock".into(),
        });
        let err = client.call("put", "/identifiers", None).await.unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedMethod(m) if m == "put"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_get_against_missing_socket_is_not_running() {
        let client = AgentClient::new(Transport::Unix {
            socket_path: "/tmp/nonexistent-didsock.sock".into(),
        });
        let err = client.get("/identifiers/did:example:123").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::NotRunning(_))
        ));
    }
}
