//! Mock agent daemon for tests.
//!
//! Serves the agent's HTTP surface from an axum router bound to a Unix
//! socket in an owned temp directory or to an ephemeral loopback TCP port.
//! Every request is recorded (method, path, raw body) so tests can assert
//! on exactly what went over the wire, and responses are canned JSON shaped
//! like the real agent's.

use std::net::SocketAddr;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

use didsock_client::Transport;

/// Version string reported by GET `/internal/version/get`.
pub const MOCK_AGENT_VERSION: &str = "3.3.0";

/// Exact body returned by the synthetic-failure routes.
pub const SYNTHETIC_FAILURE_BODY: &str = r#"{"error":"synthetic agent failure"}"#;

/// One request as seen by the mock agent.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// The recorded body decoded as JSON, if it was JSON.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockState {
    fn record(&self, method: &Method, path: &str, body: &[u8]) {
        self.requests
            .lock()
            .expect("mock agent request log poisoned")
            .push(RecordedRequest {
                method: method.to_string(),
                path: path.to_string(),
                body: body.to_vec(),
            });
    }
}

/// Build the mock agent router. Exposed for `tower::ServiceExt::oneshot`
/// style tests that don't need a live listener.
fn router(state: MockState) -> Router {
    Router::new()
        .route("/identifiers", post(create_identifier))
        .route("/identifiers/{did}", get(find_identifier))
        .route("/events", post(accept_no_content))
        .route("/custom_metrics", post(accept_no_content))
        .route("/logs", post(accept_no_content))
        .route("/create-didcomm-message", post(create_didcomm_message))
        .route("/verify-didcomm-message", post(verify_message))
        .route("/create-verifiable-message", post(create_verifiable_message))
        .route("/verify-verifiable-message", post(verify_message))
        .route("/internal/version/get", get(version_get))
        .route("/internal/version/update", post(accept_no_content))
        .route(
            "/synthetic/{status}",
            get(synthetic_failure).post(synthetic_failure),
        )
        .with_state(state)
}

/// A mock agent with a live listener, for end-to-end client tests.
///
/// The temp directory owning the Unix socket is deleted when this value
/// drops, and the server task is aborted, so cleanup happens even on panic.
pub struct MockAgent {
    binding: Binding,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    server: JoinHandle<()>,
    _temp_dir: Option<TempDir>,
}

enum Binding {
    #[cfg(unix)]
    Unix(PathBuf),
    Tcp(SocketAddr),
}

impl MockAgent {
    /// Start a mock agent on a Unix socket inside a fresh temp directory.
    #[cfg(unix)]
    pub async fn unix() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("agent.sock");

        let state = MockState::default();
        let requests = Arc::clone(&state.requests);

        let listener = UnixListener::bind(&socket_path).expect("failed to bind mock agent socket");
        let app = router(state);
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock agent server failed");
        });

        Self {
            binding: Binding::Unix(socket_path),
            requests,
            server,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Start a mock agent on an ephemeral loopback TCP port.
    pub async fn tcp() -> Self {
        let state = MockState::default();
        let requests = Arc::clone(&state.requests);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock agent port");
        let addr = listener
            .local_addr()
            .expect("failed to read mock agent addr");

        let app = router(state);
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("mock agent server failed");
        });

        Self {
            binding: Binding::Tcp(addr),
            requests,
            server,
            _temp_dir: None,
        }
    }

    /// A client transport pointing at this mock agent.
    pub fn transport(&self) -> Transport {
        match &self.binding {
            #[cfg(unix)]
            Binding::Unix(socket_path) => Transport::Unix {
                socket_path: socket_path.clone(),
            },
            Binding::Tcp(addr) => Transport::Tcp { addr: *addr },
        }
    }

    /// The loopback port, for TCP-bound agents.
    pub fn port(&self) -> Option<u16> {
        match &self.binding {
            #[cfg(unix)]
            Binding::Unix(_) => None,
            Binding::Tcp(addr) => Some(addr.port()),
        }
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("mock agent request log poisoned")
            .clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }
}

impl Drop for MockAgent {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn create_identifier(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Json<Value> {
    state.record(&method, uri.path(), &body);
    Json(sample_did_document("did:example:EiD9aQYNUJMdgjeQetDj56LNzR6S"))
}

async fn find_identifier(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    Path(did): Path<String>,
) -> Json<Value> {
    state.record(&method, uri.path(), b"");
    Json(sample_did_document(&did))
}

async fn accept_no_content(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> StatusCode {
    state.record(&method, uri.path(), &body);
    StatusCode::NO_CONTENT
}

async fn create_didcomm_message(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    state.record(&method, uri.path(), &body);
    let Some(envelope) = parse_json(&body) else {
        return bad_request("malformed JSON body");
    };
    Json(json!({
        "ciphertext": "b64-ciphertext",
        "iv": "b64-iv",
        "protected": "b64-protected-header",
        "recipients": [{
            "encrypted_key": "b64-cek",
            "header": { "kid": envelope.get("destination_did").cloned().unwrap_or(Value::Null) },
        }],
        "tag": "b64-tag",
    }))
    .into_response()
}

async fn create_verifiable_message(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    state.record(&method, uri.path(), &body);
    let Some(envelope) = parse_json(&body) else {
        return bad_request("malformed JSON body");
    };
    Json(json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiableCredential"],
        "issuer": { "id": "did:example:issuer" },
        "issuanceDate": "2024-03-22T11:43:47Z",
        "credentialSubject": {
            "container": {
                "destination_did": envelope.get("destination_did").cloned().unwrap_or(Value::Null),
                "payload": envelope.get("message").cloned().unwrap_or(Value::Null),
            }
        },
        "proof": {
            "type": "EcdsaSecp256k1Signature2019",
            "proofPurpose": "authentication",
            "jws": "b64-jws",
        },
    }))
    .into_response()
}

/// Shared by both verify endpoints: unwrap the `message` field (a JSON
/// string) and echo the decoded content back, the way the real agent
/// returns the verified plaintext.
async fn verify_message(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    state.record(&method, uri.path(), &body);
    let Some(value) = parse_json(&body) else {
        return bad_request("malformed JSON body");
    };
    let Some(message) = value.get("message").and_then(Value::as_str) else {
        return bad_request("message field is required");
    };
    match serde_json::from_str::<Value>(message) {
        Ok(inner) => Json(json!({ "message": inner })).into_response(),
        Err(_) => bad_request("message is not a JSON string"),
    }
}

async fn version_get(State(state): State<MockState>, method: Method, uri: Uri) -> Json<Value> {
    state.record(&method, uri.path(), b"");
    Json(json!({ "version": MOCK_AGENT_VERSION }))
}

async fn synthetic_failure(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    Path(status): Path<u16>,
    body: Bytes,
) -> Response {
    state.record(&method, uri.path(), &body);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, SYNTHETIC_FAILURE_BODY.to_string()).into_response()
}

fn parse_json(body: &[u8]) -> Option<Value> {
    serde_json::from_slice(body).ok()
}

fn bad_request(reason: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}

fn sample_did_document(did: &str) -> Value {
    json!({
        "didDocument": {
            "id": did,
            "publicKey": [{
                "id": "#signingKey",
                "type": "EcdsaSecp256k1VerificationKey2019",
            }],
            "authentication": ["#signingKey"],
        },
        "methodMetadata": {
            "published": true,
        },
    })
}
