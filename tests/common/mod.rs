#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use mailchimp_sync::{AppState, routes, services::mailchimp::MailChimpClient};
use serde_json::{Value, json};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::MockServer;

pub const API_KEY: &str = "0123456789abcdef-us6";

/// `Authorization` header MailChimp expects for [`API_KEY`]
pub const BASIC_AUTH: &str = "Basic YXBpa2V5OjAxMjM0NTY3ODlhYmNkZWYtdXM2";

/// MailChimp client pointed at a mock server
pub fn mock_client(server: &MockServer) -> MailChimpClient {
    MailChimpClient::with_base_url(reqwest::Client::new(), API_KEY.to_string(), server.uri())
}

/// Full router over the given pool, talking to a mock MailChimp
pub fn app(pool: PgPool, server: &MockServer) -> Router {
    let state = Arc::new(AppState::with_client(pool, mock_client(server)));
    routes::create_routes(state)
}

/// Send one request through the router and decode the JSON response
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

/// A complete, valid list
///
/// NOTE: Keep in sync with `src/utils/test_utils.rs::list_payload()` which serves
/// unit tests. Integration tests can't access #[cfg(test)] items from the library.
pub fn list_payload() -> Value {
    json!({
        "name": "New list",
        "permission_reminder": "You signed up for updates on Greeks economy.",
        "email_type_option": false,
        "contact": {
            "company": "Doe Ltd.",
            "address1": "DoeStreet 1",
            "address2": "",
            "city": "Doesy",
            "state": "Doedoe",
            "zip": "1672-12",
            "country": "US",
            "phone": "55533344412"
        },
        "campaign_defaults": {
            "from_name": "John Doe",
            "from_email": "john@doe.com",
            "subject": "My new campaign!",
            "language": "US"
        },
        "visibility": "prv",
        "use_archive_bar": false,
        "notify_on_subscribe": "notify@loyaltycorp.com.au",
        "notify_on_unsubscribe": "notify@loyaltycorp.com.au"
    })
}

pub fn member_payload() -> Value {
    json!({
        "email_address": "john@doe.com",
        "status": "subscribed"
    })
}
