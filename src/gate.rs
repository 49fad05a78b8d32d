//! The email access gate.

use crate::email::{EmailAddress, ValidationError};
use crate::error::TinderGenError;
use crate::mailing::Subscriber;
use crate::session::Session;
use std::sync::Arc;

/// Why an email submission did not unlock the session.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The input is not shaped like an email address.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The mailing list rejected the address or could not be reached.
    #[error("could not subscribe you right now: {0}")]
    Registration(#[source] TinderGenError),
}

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The address was registered and the session is now unlocked.
    Unlocked,
    /// The session was already unlocked; nothing was sent.
    AlreadyUnlocked,
}

/// Collects an email, registers it, and unlocks the generator for the session.
#[derive(Clone)]
pub struct AccessGate {
    subscriber: Arc<dyn Subscriber>,
}

impl AccessGate {
    /// Creates a gate that registers addresses through `subscriber`.
    pub fn new(subscriber: Arc<dyn Subscriber>) -> Self {
        Self { subscriber }
    }

    /// Validates `raw` and, if it passes, registers it and unlocks `session`.
    ///
    /// Makes exactly one registration call per valid submission and none for an
    /// invalid one or an already unlocked session. The flag is left untouched on
    /// any error.
    pub async fn submit_email(
        &self,
        session: &Session,
        raw: &str,
    ) -> Result<GateOutcome, GateError> {
        // Held across the call so two racing submits cannot both register
        let mut state = session.state().await;
        if state.is_unlocked() {
            return Ok(GateOutcome::AlreadyUnlocked);
        }

        let email = EmailAddress::parse(raw)?;

        match self.subscriber.subscribe(&email).await {
            Ok(()) => {
                state.unlock();
                tracing::info!(session = %session.id(), email = %email.masked(), "access gate unlocked");
                Ok(GateOutcome::Unlocked)
            }
            Err(e) => {
                tracing::warn!(
                    session = %session.id(),
                    email = %email.masked(),
                    error = %e,
                    "mailing list registration failed"
                );
                Err(GateError::Registration(e))
            }
        }
    }
}
