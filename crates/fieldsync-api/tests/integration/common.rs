//! Shared test helpers for backend API integration tests
//!
//! Each test mounts its own endpoint mocks on the returned server. The
//! client uses the default tenant configuration, so mocked paths follow
//! `/api/demo/...` and the context parameters are `empr=1` / `fili=1`.

use serde_json::{json, Value};
use wiremock::MockServer;

use fieldsync_api::RemoteClient;
use fieldsync_core::config::Config;
use fieldsync_core::domain::queue::{HttpAction, QueuedOperation};

/// Starts a mock server and returns it with a client pointed at it.
pub async fn setup() -> (MockServer, RemoteClient) {
    let server = MockServer::start().await;
    let config = Config::default();
    let client = RemoteClient::with_base_url(&config, server.uri());

    (server, client)
}

/// A queued order-creation entry carrying the given payload.
pub fn order_entry(payload: Value) -> QueuedOperation {
    QueuedOperation::new(HttpAction::Post, "Os/ordens/", payload, None)
}

/// A minimal order payload with temporary ids, as the use case queues it.
pub fn sample_payload() -> Value {
    json!({
        "os_os": "LOCAL-A",
        "os_clie": "123",
        "pecas": [{"peca_item": "LOCAL-P1", "peca_prod": "77"}]
    })
}
