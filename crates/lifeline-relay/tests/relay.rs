//! Integration tests for the relay clients using wiremock HTTP mocks.

use lifeline_core::{
    Coordinate, DescriptionEnhancer, EmergencyCategory, EmergencyNotice, EmergencySink,
    NotifyStatus,
};
use lifeline_relay::{EnhancerClient, MailerClient, RelayError};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notice() -> EmergencyNotice {
    EmergencyNotice {
        category: EmergencyCategory::Medical,
        location: Coordinate::new(18.5204, 73.8567).expect("valid coordinate"),
    }
}

fn mailer(base_url: &str) -> MailerClient {
    MailerClient::with_base_url("service_1", "template_1", "public_key_1", 30, base_url)
        .expect("client construction should not fail")
}

fn enhancer(base_url: &str) -> EnhancerClient {
    EnhancerClient::with_base_url("test-key", "gemini-1.5-flash", 30, base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn mailer_posts_the_template_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1.0/email/send"))
        .and(body_partial_json(serde_json::json!({
            "service_id": "service_1",
            "template_id": "template_1",
            "user_id": "public_key_1",
            "template_params": {
                "emergency_type": "medical",
                "latitude": "18.520400",
                "longitude": "73.856700",
                "location_link": "https://www.google.com/maps?q=18.520400,73.856700"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let client = mailer(&server.uri());
    client
        .send_alert(&notice())
        .await
        .expect("send should succeed against the mock");
}

#[tokio::test]
async fn mailer_reports_sent_through_the_sink_trait() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let client = mailer(&server.uri());
    let status = client
        .notify(&notice())
        .await
        .expect("notify should succeed");
    assert_eq!(status, NotifyStatus::Sent);
}

#[tokio::test]
async fn mailer_surfaces_non_success_statuses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1.0/email/send"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = mailer(&server.uri());
    let err = client
        .send_alert(&notice())
        .await
        .expect_err("a 403 must be an error");
    assert!(matches!(
        err,
        RelayError::UnexpectedStatus { status, .. } if status.as_u16() == 403
    ));

    let sink_err = client
        .notify(&notice())
        .await
        .expect_err("the sink must surface the failure");
    assert!(sink_err.to_string().contains("403"));
}

#[tokio::test]
async fn enhancer_returns_the_first_candidate_text() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "candidates": [
            {
                "content": {
                    "parts": [
                        { "text": "Medical emergency reported at the caller's position." }
                    ]
                }
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{ "parts": [{}] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = enhancer(&server.uri());
    let text = client
        .enhance_description("medical emergency at current location")
        .await
        .expect("should parse the completion");
    assert_eq!(text, "Medical emergency reported at the caller's position.");
}

#[tokio::test]
async fn enhancer_treats_an_empty_candidate_list_as_no_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": []
        })))
        .mount(&server)
        .await;

    let client = enhancer(&server.uri());
    let err = client
        .enhance_description("seed")
        .await
        .expect_err("no candidates must be an error");
    assert!(matches!(err, RelayError::EmptyCompletion));
}

#[tokio::test]
async fn enhancer_treats_blank_text_as_no_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        })))
        .mount(&server)
        .await;

    let client = enhancer(&server.uri());
    let err = client
        .enhance_description("seed")
        .await
        .expect_err("whitespace-only text must be an error");
    assert!(matches!(err, RelayError::EmptyCompletion));
}

#[tokio::test]
async fn enhancer_surfaces_non_success_statuses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = enhancer(&server.uri());
    let err = client
        .enhance_description("seed")
        .await
        .expect_err("a 500 must be an error");
    assert!(matches!(
        err,
        RelayError::UnexpectedStatus { status, .. } if status.as_u16() == 500
    ));
}

#[tokio::test]
async fn enhancer_rejects_a_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = enhancer(&server.uri());
    let err = client
        .enhance_description("seed")
        .await
        .expect_err("garbage must be an error");
    assert!(matches!(err, RelayError::Deserialize { .. }));
}

#[tokio::test]
async fn enhancer_works_through_the_trait_object() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "Rewritten." }] } }]
        })))
        .mount(&server)
        .await;

    let client: Box<dyn DescriptionEnhancer> = Box::new(enhancer(&server.uri()));
    let text = client.enhance("seed").await.expect("trait call should work");
    assert_eq!(text, "Rewritten.");
}
