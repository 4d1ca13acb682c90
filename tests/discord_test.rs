//! HTTP contract tests for the Discord channel

use serde_json::json;
use std::sync::Arc;
use torrent_relay::notification::DiscordConfig;
use torrent_relay::{
    DeliveryError, DeliveryOutcome, Destination, DiscordChannel, NotificationDispatcher,
    NotificationSink, SinkError,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn channel(server: &MockServer) -> DiscordChannel {
    DiscordChannel::new(DiscordConfig {
        token: "bot-token".to_string(),
        api_base: server.uri(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_send_posts_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/100/messages"))
        .and(header("authorization", "Bot bot-token"))
        .and(body_json(json!({ "content": "Ahoy!" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1" })))
        .expect(1)
        .mount(&server)
        .await;

    channel(&server)
        .send(&Destination::new("100"), "Ahoy!")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_forbidden_is_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/100/messages"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = channel(&server)
        .send(&Destination::new("100"), "Ahoy!")
        .await
        .unwrap_err();
    assert_eq!(err, SinkError::PermissionDenied("100".to_string()));
}

#[tokio::test]
async fn test_rate_limited_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/100/messages"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = channel(&server)
        .send(&Destination::new("100"), "Ahoy!")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SinkError::Rejected {
            destination: "100".to_string(),
            status: 429
        }
    );
}

#[tokio::test]
async fn test_dispatcher_falls_through_to_next_channel() {
    // Given: channel 1 denies the bot, channels 2 and 3 accept
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/1/messages"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/2/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/channels/3/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = NotificationDispatcher::new(Arc::new(channel(&server))).with_destinations([
        Destination::new("1"),
        Destination::new("2"),
        Destination::new("3"),
    ]);

    // When
    let outcome = dispatcher.deliver("Ahoy!").await.unwrap();

    // Then: delivered exactly once, via channel 2
    assert_eq!(outcome, DeliveryOutcome::Delivered(Destination::new("2")));
}

#[tokio::test]
async fn test_dispatcher_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let dispatcher = NotificationDispatcher::new(Arc::new(channel(&server)))
        .with_destinations([Destination::new("1"), Destination::new("2")]);

    let err = dispatcher.deliver("Ahoy!").await.unwrap_err();
    assert_eq!(err, DeliveryError::Exhausted { attempts: 2 });
}
