//! Test utilities for the MailChimp synchronizers
//!
//! Provides an in-memory `MailChimpApi` that records every call and sample
//! payloads shared by the unit tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

use crate::services::mailchimp::{MailChimpApi, MailChimpError};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<RecordedCall>,
    failure: Option<String>,
    next_id: u64,
}

/// MailChimp stand-in: succeeds with generated ids until told to fail
#[derive(Clone, Default)]
pub struct FakeMailChimp {
    state: Arc<Mutex<FakeState>>,
}

impl FakeMailChimp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake whose every call fails with `Invalid Resource: <detail>`
    pub fn failing(detail: &str) -> Self {
        let fake = Self::new();
        fake.fail_with(detail);
        fake
    }

    pub fn fail_with(&self, detail: &str) {
        self.state.lock().unwrap().failure = Some(detail.to_string());
    }

    pub fn succeed(&self) {
        self.state.lock().unwrap().failure = None;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(
        &self,
        method: &'static str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, MailChimpError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        if let Some(detail) = &state.failure {
            return Err(MailChimpError::Api {
                status: StatusCode::BAD_REQUEST,
                title: "Invalid Resource".to_string(),
                detail: detail.clone(),
            });
        }

        match method {
            "POST" => {
                state.next_id += 1;
                let mut created = body.cloned().unwrap_or_else(|| json!({}));
                created["id"] = json!(format!("fake{:06x}", state.next_id));
                Ok(created)
            }
            "DELETE" => Ok(Value::Null),
            _ => Ok(body.cloned().unwrap_or_else(|| json!({}))),
        }
    }
}

#[async_trait]
impl MailChimpApi for FakeMailChimp {
    async fn get(&self, path: &str) -> Result<Value, MailChimpError> {
        self.record("GET", path, None)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, MailChimpError> {
        self.record("POST", path, Some(body))
    }

    async fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value, MailChimpError> {
        self.record("PATCH", path, body)
    }

    async fn delete(&self, path: &str) -> Result<Value, MailChimpError> {
        self.record("DELETE", path, None)
    }
}

/// A complete, valid list
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

/// A complete, valid member
pub fn member_payload() -> Value {
    json!({
        "email_address": "john@doe.com",
        "status": "subscribed"
    })
}
