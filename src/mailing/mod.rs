//! Mailing-list registration.

mod mailerlite;

pub use mailerlite::{MailerLiteClient, MailerLiteClientBuilder, DEFAULT_BASE_URL};

use crate::email::EmailAddress;
use crate::error::Result;
use async_trait::async_trait;

/// Registers addresses with an external mailing list.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Creates the subscriber, or resubscribes one that already exists.
    ///
    /// Registering the same address twice must succeed without creating a duplicate.
    async fn subscribe(&self, email: &EmailAddress) -> Result<()>;
}
