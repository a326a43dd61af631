use anyhow::Result;
use auditedge_engine::agents::genai_client::mocks::MockAiClient;
use auditedge_engine::config::AuditConfig;
use auditedge_engine::prompt::build_prompt;
use auditedge_engine::{AuditError, Auditor, MetricName, Priority, Suggestion};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

const CONTRACT: &str = r#"pragma solidity ^0.8.0;

contract Bank {
    mapping(address => uint256) balances;

    function withdraw(uint256 amount) public {
        require(balances[msg.sender] >= amount);
        (bool sent, ) = msg.sender.call{value: amount}("");
        require(sent);
        balances[msg.sender] -= amount;
    }
}"#;

fn model_output() -> String {
    json!([
        {
            "section": "Audit Report",
            "details": "withdraw() sends ether before updating the balance, allowing reentrancy."
        },
        {
            "section": "Metric Scores",
            "details": [
                { "metric": "Security", "score": "2" },
                { "metric": "Performance", "score": "7" },
                { "metric": "Other Key Areas", "score": "5" },
                { "metric": "Gas Efficiency", "score": "6" },
                { "metric": "Code Quality", "score": "5" },
                { "metric": "Documentation", "score": "1" }
            ]
        },
        {
            "section": "Suggestions for Improvement",
            "details": "**Critical:** Apply checks-effects-interactions in withdraw(). **Low Priority:** Document the public functions."
        }
    ])
    .to_string()
}

fn unavailable() -> AuditError {
    AuditError::ServiceUnavailable {
        status: 503,
        message: "The model is overloaded. Please try again later.".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_mock_pipeline_recovers_from_overload() -> Result<()> {
    let mock = MockAiClient::new();
    mock.add_error(unavailable());
    mock.add_error(unavailable());
    mock.add_response(format!("```json\n{}\n```", model_output()));

    let result = Auditor::new(mock.clone()).analyze(CONTRACT).await?;

    assert_eq!(mock.calls(), 3);
    assert!(mock.prompts().iter().all(|p| *p == build_prompt(CONTRACT)));
    assert!(result.report.contains("reentrancy"));
    assert_eq!(result.metrics.len(), 6);
    assert_eq!(
        result.metric(&MetricName::Security).and_then(|m| m.score),
        Some(2.0)
    );
    assert_eq!(
        result.suggestions,
        vec![
            Suggestion::new(
                Priority::Critical,
                "Apply checks-effects-interactions in withdraw()."
            ),
            Suggestion::new(Priority::Low, "Document the public functions."),
        ]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_mock_pipeline_exhausts_retries() -> Result<()> {
    let mock = MockAiClient::new();
    for _ in 0..3 {
        mock.add_error(unavailable());
    }
    mock.add_response(model_output());

    let err = Auditor::new(mock.clone())
        .analyze(CONTRACT)
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::RetryExhausted { attempts: 3, .. }));
    assert_eq!(mock.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_mock_pipeline_auth_failure_is_terminal() -> Result<()> {
    let mock = MockAiClient::new();
    mock.add_error(AuditError::Auth("API key not valid".to_string()));
    mock.add_response(model_output());

    let err = Auditor::new(mock.clone())
        .analyze(CONTRACT)
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::Auth(_)));
    assert_eq!(mock.calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_request_delivers_nothing() -> Result<()> {
    let mock = MockAiClient::new();
    mock.add_error(unavailable());
    mock.add_response(model_output());
    let auditor = Auditor::new(mock.clone());

    // Abandon the request during the first 2s backoff sleep.
    let outcome = tokio::time::timeout(Duration::from_millis(500), auditor.analyze(CONTRACT)).await;

    assert!(outcome.is_err());
    assert_eq!(mock.calls(), 1);

    // Nothing keeps running after the future is dropped.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(mock.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() -> Result<()> {
    let first = MockAiClient::new();
    first.add_response(model_output());
    let second = MockAiClient::new();
    second.add_response("not json at all");

    let (first, second) = (Auditor::new(first), Auditor::new(second));

    let (ok, failed) = tokio::join!(
        first.analyze(CONTRACT),
        second.analyze("contract Empty {}"),
    );

    assert!(ok.is_ok());
    assert!(matches!(failed, Err(AuditError::MalformedResponse { .. })));
    Ok(())
}

fn http_config(server: &MockServer) -> AuditConfig {
    let mut config = AuditConfig::default();
    config.endpoint = server.base_url();
    config.retry.initial_delay_ms = 10;
    config
}

#[tokio::test]
async fn test_http_pipeline_success() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.0-flash:generateContent")
                .header("x-goog-api-key", "e2e-key");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": format!("```json\n{}\n```", model_output()) }]
                    },
                    "finishReason": "STOP"
                }]
            }));
        })
        .await;

    let auditor = Auditor::from_config("e2e-key".to_string(), &http_config(&server))?;
    let result = auditor.analyze(CONTRACT).await?;

    mock.assert_async().await;
    assert_eq!(result.metrics.len(), 6);
    assert_eq!(result.suggestions.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_http_pipeline_retries_server_errors() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(503).json_body(json!({
                "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
            }));
        })
        .await;

    let auditor = Auditor::from_config("e2e-key".to_string(), &http_config(&server))?;
    let err = auditor.analyze(CONTRACT).await.unwrap_err();

    mock.assert_calls_async(3).await;
    match err {
        AuditError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, AuditError::ServiceUnavailable { status: 503, .. }));
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_http_pipeline_rejected_key_single_request() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(401).body("unauthorized");
        })
        .await;

    let auditor = Auditor::from_config("bad-key".to_string(), &http_config(&server))?;
    let err = auditor.analyze(CONTRACT).await.unwrap_err();

    mock.assert_calls_async(1).await;
    assert!(matches!(err, AuditError::Auth(_)));
    Ok(())
}
