// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for the HTTP gateway using wiremock.
//!
//! Covers:
//! - Request body shape
//! - Empty bodies
//! - Status code mapping and error messages
//! - Unreachable backends and timeouts

use std::time::Duration;

use serde_json::{Value, json};
use stack_cache::error::{ErrorKind, GatewayError};
use stack_cache::gateway::{CommandGateway, HttpGateway, params};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer) -> HttpGateway {
    HttpGateway::new(format!("{}/invoke", server.uri()))
}

// =============================================================================
// Success
// =============================================================================

#[tokio::test]
async fn test_posts_command_and_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoke"))
        .and(body_json(json!({ "command": "stacks", "params": { "projectId": "p1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "s1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let result = gateway_for(&server)
        .invoke("stacks", params(json!({ "projectId": "p1" })))
        .await
        .unwrap();

    assert_eq!(result, json!([{ "id": "s1" }]));
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result = gateway_for(&server)
        .invoke("undo_commit", params(json!({})))
        .await
        .unwrap();

    assert_eq!(result, Value::Null);
}

// =============================================================================
// Status mapping
// =============================================================================

#[tokio::test]
async fn test_client_errors_are_validation_errors() {
    for status in [400, 404, 422] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "message": "bad stackId" })))
            .mount(&server)
            .await;

        let err = gateway_for(&server)
            .invoke("stack_branches", params(json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation, "status {status}");
        assert_eq!(err.command(), "stack_branches");
    }
}

#[tokio::test]
async fn test_message_field_is_preferred() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "code": "x", "message": "name taken" })),
        )
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .invoke("create_series", params(json!({})))
        .await
        .unwrap_err();

    insta::assert_snapshot!(err.to_string(), @"invalid params for 'create_series': name taken");
}

#[tokio::test]
async fn test_server_errors_are_domain_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("  merge conflict \n"))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .invoke("undo_commit", params(json!({})))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Domain);
    insta::assert_snapshot!(err.to_string(), @"command 'undo_commit' was rejected: merge conflict");
}

#[tokio::test]
async fn test_empty_error_body_names_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .invoke("stacks", params(json!({})))
        .await
        .unwrap_err();

    insta::assert_snapshot!(err.to_string(), @"command 'stacks' was rejected: http status 503");
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .invoke("stacks", params(json!({})))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Decode { .. }), "got {err:?}");
}

// =============================================================================
// Transport
// =============================================================================

#[tokio::test]
async fn test_unreachable_backend() {
    let err = HttpGateway::new("http://127.0.0.1:1/invoke")
        .invoke("stacks", params(json!({})))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Unreachable { .. }), "got {err:?}");
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .timeout(Duration::from_millis(50))
        .invoke("stacks", params(json!({})))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GatewayError::Timeout {
            command: "stacks".to_string(),
            timeout_ms: 50,
        }
    );
}
