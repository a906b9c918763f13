//! Shared fixtures for the HTTP tests.

use serde_json::{json, Value};
use wiremock::MockServer;

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_token() -> String {
    "eyJhbGciOiJIUzI1NiJ9.test.signature".to_string()
}

/// A persisted task as the backend returns it.
pub fn task_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "taskJson": {
            "pages": [{
                "url": "https://example.com/login",
                "steps": [{
                    "action": "type",
                    "location": "#email",
                    "variable": "user",
                    "keyValuePairs": []
                }]
            }]
        },
        "variables": { "user": "bob" },
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": "2024-05-02T10:00:00Z"
    })
}
