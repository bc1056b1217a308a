//! End-to-end tests: the client against the mock agent, over both
//! transports.

use didsock_client::types::{
    CustomMetric, Event, LogMessage, MessageEnvelope, VerifyRequest, VersionUpdate,
};
use didsock_client::{AgentClient, AgentReply, ClientError, Transport, TransportError};
use didsock_test_utils::mock_agent::{MOCK_AGENT_VERSION, SYNTHETIC_FAILURE_BODY};
use didsock_test_utils::MockAgent;
use serde_json::json;

#[cfg(unix)]
mod unix_transport {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test_log::test(tokio::test)]
    async fn version_get_returns_agent_json_unchanged() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        let reply = client.get("/internal/version/get").await.unwrap();
        assert_eq!(reply, AgentReply::Json(json!({ "version": MOCK_AGENT_VERSION })));
    }

    #[test_log::test(tokio::test)]
    async fn events_post_yields_no_content() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        let payload = json!({ "key": "k", "detail": "d", "occurred_at": 1_700_000_000u64 });
        let reply = client.post("/events", Some(&payload)).await.unwrap();
        assert_eq!(reply, AgentReply::NoContent);
        assert_eq!(reply.to_string(), "no content");
    }

    #[test_log::test(tokio::test)]
    async fn post_round_trips_payload_losslessly() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        let payload = json!({
            "string": "value",
            "number": 1,
            "float": 10.52,
            "boolean": true,
            "array": ["foo", "bar", "baz"],
            "map": { "key": "value", "nested": { "deep": null } },
        });
        client.post("/events", Some(&payload)).await.unwrap();

        let recorded = agent.last_request().expect("request was not recorded");
        assert_eq!(recorded.method, "POST");
        assert_eq!(recorded.path, "/events");
        assert_eq!(recorded.body_json().unwrap(), payload);
    }

    #[test_log::test(tokio::test)]
    async fn post_without_payload_sends_empty_object() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        client.post("/identifiers", None).await.unwrap();

        let recorded = agent.last_request().expect("request was not recorded");
        assert_eq!(recorded.body_json().unwrap(), json!({}));
    }

    #[test_log::test(tokio::test)]
    async fn failure_statuses_carry_status_and_body() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        for raw in [400u16, 404, 500] {
            let err = client
                .get(&format!("/synthetic/{raw}"))
                .await
                .expect_err("synthetic failure must not decode as success");
            match err {
                ClientError::Api {
                    status,
                    reason,
                    body,
                } => {
                    assert_eq!(status, raw);
                    assert!(!reason.is_empty());
                    assert_eq!(body, SYNTHETIC_FAILURE_BODY);
                }
                other => panic!("expected Api error, got {other:?}"),
            }
        }
    }

    #[test_log::test(tokio::test)]
    async fn typed_identifier_flow() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        let created = client.create_identifier().await.unwrap();
        assert!(created["didDocument"]["id"].is_string());

        let did = "did:example:EiDFindMe";
        let found = client.find_identifier(did).await.unwrap();
        assert_eq!(found["didDocument"]["id"], json!(did));
    }

    #[test_log::test(tokio::test)]
    async fn typed_telemetry_flow() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        let event = Event {
            key: "test-key".to_string(),
            detail: "test-detail".to_string(),
            occurred_at: 1_700_000_000,
        };
        assert_eq!(client.send_event(&event).await.unwrap(), AgentReply::NoContent);

        let batch = vec![event.clone(), event];
        assert_eq!(client.send_events(&batch).await.unwrap(), AgentReply::NoContent);
        let recorded = agent.last_request().unwrap();
        assert!(recorded.body_json().unwrap().is_array());

        let metric = CustomMetric {
            key: "cpu".to_string(),
            value: 10.52,
            occurred_at: "1700000000".to_string(),
        };
        assert_eq!(
            client.send_custom_metric(&metric).await.unwrap(),
            AgentReply::NoContent
        );

        let log = LogMessage {
            message: "test-message".to_string(),
            occurred_at: 1_700_000_000_000,
        };
        assert_eq!(client.send_log(&log).await.unwrap(), AgentReply::NoContent);
    }

    #[test_log::test(tokio::test)]
    async fn typed_message_flow() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        let inner = json!({ "string": "value", "number": 1 });
        let envelope = MessageEnvelope {
            destination_did: "did:example:EiDDestination".to_string(),
            message: inner.to_string(),
            operation_tag: "test-operation-tag".to_string(),
        };

        let didcomm = client.create_didcomm_message(&envelope).await.unwrap();
        assert!(didcomm["ciphertext"].is_string());

        let verified = client
            .verify_didcomm_message(&VerifyRequest {
                message: envelope.message.clone(),
            })
            .await
            .unwrap();
        assert_eq!(verified["message"], inner);

        let vc = client.create_verifiable_message(&envelope).await.unwrap();
        assert_eq!(
            vc["credentialSubject"]["container"]["destination_did"],
            json!(envelope.destination_did)
        );

        let verified_vc = client
            .verify_verifiable_message(&VerifyRequest {
                message: envelope.message.clone(),
            })
            .await
            .unwrap();
        assert_eq!(verified_vc["message"], inner);
    }

    #[test_log::test(tokio::test)]
    async fn typed_version_flow() {
        let agent = MockAgent::unix().await;
        let client = AgentClient::new(agent.transport());

        let info = client.version_get().await.unwrap();
        assert_eq!(info.version, MOCK_AGENT_VERSION);

        let update = VersionUpdate::new("http://example.com/agent-1.0.0.zip", "/tmp");
        let reply = client.version_update(&update).await.unwrap();
        assert_eq!(reply, AgentReply::NoContent);

        let recorded = agent.last_request().unwrap();
        assert_eq!(recorded.path, "/internal/version/update");
        assert_eq!(
            recorded.body_json().unwrap(),
            json!({
                "message": {
                    "binary_url": "http://example.com/agent-1.0.0.zip",
                    "path": "/tmp",
                }
            })
        );
    }
}

mod tcp_transport {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test_log::test(tokio::test)]
    async fn same_contract_over_tcp() {
        let agent = MockAgent::tcp().await;
        let client = AgentClient::new(agent.transport());

        let info = client.version_get().await.unwrap();
        assert_eq!(info.version, MOCK_AGENT_VERSION);

        let payload = json!({ "key": "k", "detail": "d", "occurred_at": 1_700_000_000u64 });
        let reply = client.post("/events", Some(&payload)).await.unwrap();
        assert_eq!(reply, AgentReply::NoContent);

        let recorded = agent.last_request().unwrap();
        assert_eq!(recorded.body_json().unwrap(), payload);
    }

    #[test_log::test(tokio::test)]
    async fn failure_statuses_carry_status_and_body_over_tcp() {
        let agent = MockAgent::tcp().await;
        let client = AgentClient::new(agent.transport());

        let err = client.get("/synthetic/500").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
    }

    #[test_log::test(tokio::test)]
    async fn connect_failure_is_fatal_not_retried() {
        // Bind a port, then drop the agent so nothing is listening.
        let agent = MockAgent::tcp().await;
        let transport = agent.transport();
        drop(agent);

        // Give the kernel a moment to tear the listener down.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let client = AgentClient::new(transport);
        let err = client.get("/internal/version/get").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Connect { .. })
        ));
    }
}

#[test_log::test(tokio::test)]
async fn construction_with_missing_port_fails_before_io() {
    use didsock_client::{TransportMode, TransportSettings};

    let settings = TransportSettings {
        mode: TransportMode::Tcp,
        socket_path: None,
        port: None,
    };
    let result = Transport::resolve(&settings);
    assert!(matches!(result, Err(TransportError::MissingPort)));
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn unsupported_method_fails_without_a_network_call() {
    let agent = MockAgent::unix().await;
    let client = AgentClient::new(agent.transport());

    let err = client
        .call("put", "/identifiers", None)
        .await
        .expect_err("put is not part of the agent API");
    assert!(matches!(err, ClientError::UnsupportedMethod(m) if m == "put"));

    // Nothing reached the agent.
    assert!(agent.requests().is_empty());
}
