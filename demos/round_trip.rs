//! Walks a message through publish, list, update and delete against a live
//! broker. Connection settings come from `load_config` (`.env`, `config/`,
//! `RABBITMQ_*` variables).
//!
//! ```text
//! cargo run --example round_trip -- my_queue
//! ```

use mqcrud::{BrokerClient, ClientError, Payload, load_config, utils::logging};
use serde_json::{Value, json};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return;
        }
    };
    logging::init(&settings.logging.level);

    let queue = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "test_queue".to_string());

    let mut client = match BrokerClient::connect_with(settings.connection, &settings.client).await {
        Ok(client) => client,
        Err(e) => {
            error!("{e}");
            return;
        }
    };

    if let Err(e) = run(&mut client, &queue).await {
        error!("{e}");
    }
    client.close().await;
}

async fn run(client: &mut BrokerClient, queue: &str) -> Result<(), ClientError> {
    let status = client.check_connection_status();
    info!("status: {}", serde_json::to_string(&status).unwrap_or_default());

    let created = client
        .publish(queue, object(json!({"content": "hi", "priority": "normal"})))
        .await?;
    info!(id = %created.id, "published");

    let updated = client
        .update_message(queue, &created.id, object(json!({"content": "bye"})))
        .await?;
    info!(updated, "update finished");

    for message in client.list_messages(queue).await? {
        info!("listed: {}", serde_json::to_string(&message).unwrap_or_default());
    }

    let deleted = client.delete_message(queue, &created.id).await?;
    info!(deleted, "delete finished (queue is now empty)");

    for entry in client.get_logs() {
        info!("[{}] {}: {}", entry.source, entry.timestamp, entry.message);
    }
    Ok(())
}

fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}
