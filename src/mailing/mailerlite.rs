//! MailerLite subscriber registration.

use crate::email::EmailAddress;
use crate::error::{parse_retry_after, sanitize_error_message, Result, TinderGenError};
use crate::mailing::Subscriber;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// MailerLite Connect API root.
pub const DEFAULT_BASE_URL: &str = "https://connect.mailerlite.com/api";

/// Builder for MailerLiteClient.
#[derive(Debug, Clone, Default)]
pub struct MailerLiteClientBuilder {
    api_key: Option<String>,
    group_id: Option<String>,
    base_url: Option<String>,
}

impl MailerLiteClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bearer token.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the group every new subscriber is added to.
    pub fn group_id(mut self, id: impl Into<String>) -> Self {
        self.group_id = Some(id.into());
        self
    }

    /// Overrides the API root (defaults to [`DEFAULT_BASE_URL`]).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the client. Token and group are both required.
    pub fn build(self) -> Result<MailerLiteClient> {
        let api_key = non_empty(self.api_key)
            .ok_or_else(|| TinderGenError::Config("MailerLite API key is not set".into()))?;
        let group_id = non_empty(self.group_id)
            .ok_or_else(|| TinderGenError::Config("MailerLite group id is not set".into()))?;

        Ok(MailerLiteClient {
            client: reqwest::Client::new(),
            api_key,
            group_id,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// MailerLite client bound to one group.
pub struct MailerLiteClient {
    client: reqwest::Client,
    api_key: String,
    group_id: String,
    base_url: String,
}

impl std::fmt::Debug for MailerLiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerLiteClient")
            .field("group_id", &self.group_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl MailerLiteClient {
    /// Creates a new `MailerLiteClientBuilder`.
    pub fn builder() -> MailerLiteClientBuilder {
        MailerLiteClientBuilder::new()
    }

    fn request_body<'a>(&'a self, email: &'a EmailAddress) -> SubscribeRequest<'a> {
        SubscribeRequest {
            email: email.as_str(),
            groups: vec![self.group_id.as_str()],
            resubscribe: true,
        }
    }
}

#[async_trait]
impl Subscriber for MailerLiteClient {
    async fn subscribe(&self, email: &EmailAddress) -> Result<()> {
        let url = format!("{}/subscribers", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&self.request_body(email))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        // 200 means an existing subscriber was updated, 201 a new one was created
        tracing::debug!(
            email = %email.masked(),
            status = status.as_u16(),
            "MailerLite subscriber registered"
        );
        Ok(())
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> TinderGenError {
    let message = serde_json::from_str::<ErrorBody>(text)
        .ok()
        .map(ErrorBody::into_message)
        .unwrap_or_else(|| text.to_string());
    let message = sanitize_error_message(&message);

    match status {
        401 | 403 => TinderGenError::Auth(message),
        429 => TinderGenError::RateLimited {
            retry_after: parse_retry_after(headers).map(std::time::Duration::from_secs),
        },
        422 => TinderGenError::InvalidRequest(message),
        _ => TinderGenError::Api { status, message },
    }
}

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    email: &'a str,
    groups: Vec<&'a str>,
    resubscribe: bool,
}

/// MailerLite error envelope: a summary plus per-field details.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: std::collections::BTreeMap<String, Vec<String>>,
}

impl ErrorBody {
    fn into_message(self) -> String {
        let details: Vec<String> = self.errors.into_values().flatten().collect();
        match (self.message, details.is_empty()) {
            (Some(msg), true) => msg,
            (Some(msg), false) => format!("{msg} ({})", details.join("; ")),
            (None, false) => details.join("; "),
            (None, true) => "unknown error".to_string(),
        }
    }
}
