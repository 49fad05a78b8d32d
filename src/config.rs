//! Process-wide server configuration.
//!
//! Only server-side settings live here. The generative API key is entered by each
//! visitor and kept in their session, never in this struct.

use crate::error::{Result, TinderGenError};
use std::net::SocketAddr;
use std::time::Duration;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
/// Default cap on a whole generate form post, photo included.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
/// Default idle lifetime of a session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Server settings.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// MailerLite bearer token.
    pub mailerlite_api_key: String,
    /// MailerLite group new subscribers are added to.
    pub mailerlite_group_id: String,
    /// MailerLite API root.
    pub mailerlite_base_url: String,
    /// Gemini API root.
    pub gemini_base_url: String,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Sessions idle for longer than this are forgotten.
    pub session_ttl: Duration,
}

impl ServerConfig {
    /// Creates a config with the given mailing-list credentials and defaults elsewhere.
    pub fn new(
        mailerlite_api_key: impl Into<String>,
        mailerlite_group_id: impl Into<String>,
    ) -> Self {
        Self {
            bind: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8501))),
            mailerlite_api_key: mailerlite_api_key.into(),
            mailerlite_group_id: mailerlite_group_id.into(),
            mailerlite_base_url: crate::mailing::DEFAULT_BASE_URL.to_string(),
            gemini_base_url: crate::image::providers::DEFAULT_BASE_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Rejects settings the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.mailerlite_api_key.trim().is_empty() {
            return Err(TinderGenError::Config(
                "MailerLite API key is required (MAILERLITE_API_KEY)".into(),
            ));
        }
        if self.mailerlite_group_id.trim().is_empty() {
            return Err(TinderGenError::Config(
                "MailerLite group id is required (MAILERLITE_GROUP_ID)".into(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(TinderGenError::Config(
                "max upload size must be greater than zero".into(),
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(TinderGenError::Config(
                "session TTL must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("mailerlite_api_key", &"***")
            .field("mailerlite_group_id", &self.mailerlite_group_id)
            .field("mailerlite_base_url", &self.mailerlite_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}
