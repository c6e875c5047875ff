//! MailChimp Marketing API client
//!
//! Exposes the four verbs the synchronizers need (`get`, `post`, `patch`,
//! `delete`) behind the [`MailChimpApi`] trait so the synchronizers can be
//! driven by a fake in tests.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// MailChimp API version segment appended to the data-center host
const API_VERSION: &str = "3.0";

#[derive(Debug, Error)]
pub enum MailChimpError {
    /// MailChimp answered with a non-2xx status
    #[error("{title}: {detail}")]
    Api {
        status: StatusCode,
        title: String,
        detail: String,
    },
    /// The request never produced a response (DNS, TLS, connection reset, ...)
    #[error("MailChimp request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("MailChimp returned an unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid MailChimp API key: {0}")]
    InvalidApiKey(&'static str),
}

/// Problem-details body MailChimp sends with every error status
#[derive(Debug, Default, Deserialize)]
struct ProblemDetails {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    errors: Vec<FieldProblem>,
}

#[derive(Debug, Deserialize)]
struct FieldProblem {
    #[serde(default)]
    field: String,
    #[serde(default)]
    message: String,
}

impl MailChimpError {
    fn from_problem(status: StatusCode, problem: ProblemDetails) -> Self {
        let title = if problem.title.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string()
        } else {
            problem.title
        };

        let mut detail = problem.detail;
        if !problem.errors.is_empty() {
            let fields = problem
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            detail = if detail.is_empty() {
                fields
            } else {
                format!("{} ({})", detail, fields)
            };
        }
        if detail.is_empty() {
            detail = format!("HTTP {}", status.as_u16());
        }

        MailChimpError::Api {
            status,
            title,
            detail,
        }
    }
}

/// Remote mailing-list service as seen by the synchronizers
///
/// Paths are relative to the API root, e.g. `lists/{list_id}/members`.
/// Every call returns the decoded JSON body, or `Value::Null` when MailChimp
/// answers without one (204 on delete).
#[async_trait]
pub trait MailChimpApi: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, MailChimpError>;

    async fn post(&self, path: &str, body: &Value) -> Result<Value, MailChimpError>;

    async fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value, MailChimpError>;

    async fn delete(&self, path: &str) -> Result<Value, MailChimpError>;
}

/// MailChimp API client
#[derive(Clone)]
pub struct MailChimpClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl MailChimpClient {
    /// Creates a client for the data center encoded in the API key
    ///
    /// MailChimp keys end in `-<dc>` (e.g. `...-us6`), which selects the
    /// `https://<dc>.api.mailchimp.com` host.
    pub fn new(http_client: Client, api_key: String) -> Result<Self, MailChimpError> {
        let base_url = base_url_for_key(&api_key)?;
        Ok(Self {
            http_client,
            api_key,
            base_url,
        })
    }

    /// Creates a client against a custom API root
    ///
    /// This is useful for testing with a mock server.
    pub fn with_base_url(http_client: Client, api_key: String, base_url: String) -> Self {
        Self {
            http_client,
            api_key,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, MailChimpError> {
        let url = self.url(path);
        log::debug!("MailChimp request: {} {}", method, url);

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .basic_auth("apikey", Some(&self.api_key))
            .header("accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let problem = response.json::<ProblemDetails>().await.unwrap_or_default();
            let error = MailChimpError::from_problem(status, problem);
            log::warn!("MailChimp {} {} failed: {} - {}", method, url, status, error);
            return Err(error);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl MailChimpApi for MailChimpClient {
    async fn get(&self, path: &str) -> Result<Value, MailChimpError> {
        self.send(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, MailChimpError> {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value, MailChimpError> {
        self.send(Method::PATCH, path, body).await
    }

    async fn delete(&self, path: &str) -> Result<Value, MailChimpError> {
        self.send(Method::DELETE, path, None).await
    }
}

fn base_url_for_key(api_key: &str) -> Result<String, MailChimpError> {
    let (key, dc) = api_key
        .rsplit_once('-')
        .ok_or(MailChimpError::InvalidApiKey("missing data center suffix"))?;

    if key.is_empty() || dc.is_empty() || !dc.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(MailChimpError::InvalidApiKey("malformed data center suffix"));
    }

    Ok(format!("https://{}.api.mailchimp.com/{}", dc, API_VERSION))
}
