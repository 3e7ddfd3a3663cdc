use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;

use serde_json::json;

use super::broker_client::BrokerClient;
use super::status::{ConnectionState, ConnectionStatus};
use crate::broker::{MemoryBroker, MemoryTransport, MessageStatus, Payload};
use crate::config::ConnectionConfig;
use crate::utils::{ClientError, TransportError};

const WINDOW: Duration = Duration::from_millis(5);

fn payload(value: serde_json::Value) -> Payload {
    value.as_object().cloned().expect("payload must be a JSON object")
}

fn client(broker: &MemoryBroker) -> BrokerClient<MemoryTransport> {
    BrokerClient::connect_in_memory(broker, ConnectionConfig::default())
        .unwrap()
        .with_consume_window(WINDOW)
}

#[tokio::test]
async fn test_publish_returns_created_envelope() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);
    let data = payload(json!({"content": "Test message", "priority": "normal"}));

    let message = client.publish("test_queue", data.clone()).await.unwrap();

    assert_eq!(message.data, data);
    assert_eq!(message.status, MessageStatus::Created);
    assert!(message.timestamp > 0);
    assert!(message.updated_at.is_none());
    assert_eq!(broker.queue_len("test_queue"), Some(1));
}

#[tokio::test]
async fn test_publish_generates_unique_ids() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    let mut ids = HashSet::new();
    for _ in 0..50 {
        let message = client.publish("q", Payload::new()).await.unwrap();
        assert!(ids.insert(message.id));
    }
}

#[tokio::test]
async fn test_publish_then_list_round_trip() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);
    let data = payload(json!({"content": "retrieve me", "priority": "high"}));

    client.publish("q", data.clone()).await.unwrap();
    let messages = client.list_messages("q").await.unwrap();

    assert!(
        messages
            .iter()
            .any(|m| m.data == data && m.status == MessageStatus::Created)
    );
}

#[tokio::test]
async fn test_list_preserves_publish_order() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    let first = client.publish("q", payload(json!({"n": 1}))).await.unwrap();
    let second = client.publish("q", payload(json!({"n": 2}))).await.unwrap();

    let ids: Vec<_> = client
        .list_messages("q")
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn test_list_is_destructive() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    client.publish("q", payload(json!({"a": 1}))).await.unwrap();
    assert_eq!(client.list_messages("q").await.unwrap().len(), 1);
    assert!(client.list_messages("q").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_unknown_queue_is_empty() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    assert!(client.list_messages("never_used").await.unwrap().is_empty());
    assert_eq!(broker.queue_len("never_used"), Some(0));
}

#[tokio::test]
async fn test_list_skips_bodies_that_are_not_envelopes() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    let kept = client.publish("q", payload(json!({"ok": true}))).await.unwrap();
    broker.push_raw("q", "plain text");
    broker.push_raw("q", r#"{"id": "missing-fields"}"#);

    let messages = client.list_messages("q").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, kept.id);
    // The skipped bodies were consumed along with the rest.
    assert_eq!(broker.queue_len("q"), Some(0));
}

#[tokio::test]
async fn test_update_republishes_matched_message() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    let created = client
        .publish("q", payload(json!({"content": "Original", "priority": "normal"})))
        .await
        .unwrap();
    let new_data = payload(json!({"content": "Updated", "priority": "high"}));

    assert!(
        client
            .update_message("q", &created.id, new_data.clone())
            .await
            .unwrap()
    );

    let messages = client.list_messages("q").await.unwrap();
    assert_eq!(messages.len(), 1);
    let updated = &messages[0];
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.timestamp, created.timestamp);
    assert_eq!(updated.data, new_data);
    assert_eq!(updated.status, MessageStatus::Updated);
    assert!(updated.updated_at.is_some());
}

#[tokio::test]
async fn test_update_discards_co_resident_messages() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    let bystander = client.publish("q", payload(json!({"n": 1}))).await.unwrap();
    let target = client.publish("q", payload(json!({"n": 2}))).await.unwrap();

    assert!(
        client
            .update_message("q", &target.id, payload(json!({"n": 3})))
            .await
            .unwrap()
    );

    // Only the updated copy survives the drain.
    let remaining = client.list_messages("q").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, target.id);
    assert!(remaining.iter().all(|m| m.id != bystander.id));
}

#[tokio::test]
async fn test_update_unknown_id_drains_queue() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    client.publish("q", payload(json!({"n": 1}))).await.unwrap();

    assert!(
        !client
            .update_message("q", "dummy-id", Payload::new())
            .await
            .unwrap()
    );
    assert_eq!(broker.queue_len("q"), Some(0));
}

#[tokio::test]
async fn test_delete_found_and_queue_drained() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    let doomed = client.publish("q", payload(json!({"n": 1}))).await.unwrap();
    client.publish("q", payload(json!({"n": 2}))).await.unwrap();

    assert!(client.delete_message("q", &doomed.id).await.unwrap());
    assert!(client.list_messages("q").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_unknown_id() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    client.publish("q", Payload::new()).await.unwrap();
    assert!(!client.delete_message("q", "dummy-id").await.unwrap());
    assert_eq!(broker.queue_len("q"), Some(0));
}

#[tokio::test]
async fn test_empty_queue_name_is_rejected() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    let err = client
        .publish("", payload(json!({"invalid": "data"})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Publish(TransportError::InvalidQueueName(_))
    ));

    assert!(matches!(
        client.list_messages("").await,
        Err(ClientError::Retrieval(TransportError::InvalidQueueName(_)))
    ));
    assert!(matches!(
        client.update_message("", "id", Payload::new()).await,
        Err(ClientError::Update(_))
    ));
    assert!(matches!(
        client.delete_message("", "id").await,
        Err(ClientError::Delete(_))
    ));
}

#[tokio::test]
async fn test_whitespace_queue_name_is_passed_through() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    let created = client.publish(" ", payload(json!({"n": 1}))).await.unwrap();
    assert_eq!(broker.queue_len(" "), Some(1));

    let listed = client.list_messages(" ").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
}

#[tokio::test]
async fn test_status_echoes_config_when_connected() {
    let broker = MemoryBroker::new();
    let config = ConnectionConfig::new("rabbit.local", "challenge_vhost", "u", "p").with_port(5673);
    let client = BrokerClient::connect_in_memory(&broker, config).unwrap();

    let status = client.check_connection_status();
    assert_eq!(status.status, ConnectionState::Connected);
    assert_eq!(status.host.as_deref(), Some("rabbit.local"));
    assert_eq!(status.port, Some(5673));
    assert_eq!(status.vhost.as_deref(), Some("challenge_vhost"));
    assert!(status.error.is_none());
}

#[tokio::test]
async fn test_status_after_broker_shutdown() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    broker.shut_down();

    let status = client.check_connection_status();
    assert!(!status.is_connected());
    assert_eq!(status.error.as_deref(), Some("Connection is not open"));

    // No reconnection, even once the broker is back.
    broker.start();
    assert!(!client.check_connection_status().is_connected());
    assert!(matches!(
        client.publish("q", Payload::new()).await,
        Err(ClientError::Publish(TransportError::Closed))
    ));
}

#[test]
fn test_status_wire_format() {
    let connected = ConnectionStatus::connected(&ConnectionConfig::default());
    let value = serde_json::to_value(&connected).unwrap();
    assert_eq!(
        value,
        json!({"status": "connected", "host": "localhost", "port": 5672, "vhost": "challenge_vhost"})
    );

    let disconnected = ConnectionStatus::disconnected("Connection is not open");
    let value = serde_json::to_value(&disconnected).unwrap();
    assert_eq!(
        value,
        json!({"status": "disconnected", "error": "Connection is not open"})
    );
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);

    client.close().await;
    client.close().await;

    assert!(!client.check_connection_status().is_connected());
    assert!(matches!(
        client.list_messages("q").await,
        Err(ClientError::Retrieval(TransportError::Closed))
    ));
}

#[test]
fn test_connect_failures_are_connection_errors() {
    let broker = MemoryBroker::new()
        .with_credentials("challenge", "challenge123")
        .with_virtual_host("challenge_vhost");

    let bad_password = ConnectionConfig::new("localhost", "challenge_vhost", "challenge", "wrong");
    let err = BrokerClient::connect_in_memory(&broker, bad_password).unwrap_err();
    assert!(matches!(err, ClientError::Connection(TransportError::AccessRefused(_))));
    assert!(err.source().is_some());

    let bad_vhost = ConnectionConfig::new("localhost", "nowhere", "challenge", "challenge123");
    assert!(matches!(
        BrokerClient::connect_in_memory(&broker, bad_vhost),
        Err(ClientError::Connection(_))
    ));

    broker.shut_down();
    assert!(matches!(
        BrokerClient::connect_in_memory(&broker, ConnectionConfig::default()),
        Err(ClientError::Connection(TransportError::Unreachable { .. }))
    ));
}

#[tokio::test]
async fn test_connect_to_unreachable_amqp_broker() {
    // Port 1 on loopback is never a broker; connect is refused or times out.
    let config = ConnectionConfig::default().with_port(1);
    let settings = crate::config::ClientSettings {
        consume_window_ms: 10,
        connect_timeout_ms: 2000,
    };

    let result = BrokerClient::connect_with(config, &settings).await;
    assert!(matches!(result, Err(ClientError::Connection(_))));
}

#[tokio::test]
async fn test_get_logs_is_synthetic() {
    let broker = MemoryBroker::new();
    let client = client(&broker);

    let logs = client.get_logs();
    assert_eq!(logs.len(), 2);
    assert!(logs[0].timestamp >= logs[1].timestamp);
    assert!(logs.iter().all(|entry| !entry.message.is_empty()));
}

#[tokio::test]
async fn test_example_scenario() {
    let broker = MemoryBroker::new();
    let mut client = client(&broker);
    let data = payload(json!({"content": "hi", "priority": "normal"}));

    client.publish("q", data.clone()).await.unwrap();

    let listed = client.list_messages("q").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].data, data);
    assert_eq!(listed[0].status, MessageStatus::Created);

    // The list above drained the queue, so the update finds nothing to match.
    let id = listed[0].id.clone();
    assert!(
        !client
            .update_message("q", &id, payload(json!({"content": "bye"})))
            .await
            .unwrap()
    );
    assert!(client.list_messages("q").await.unwrap().is_empty());
}
