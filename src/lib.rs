#![warn(missing_docs)]
//! tindergen - an email-gated profile photo generator.
//!
//! Visitors first pass an access gate by leaving their email, which is registered
//! with a MailerLite group. The generator then takes a prompt, a JPEG/PNG photo and
//! the visitor's own Gemini API key, and shows the first image Gemini returns.
//!
//! # Quick Start
//!
//! ```no_run
//! use tindergen::{web, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = ServerConfig::new("mailerlite-token", "group-id");
//!     web::serve(config).await
//! }
//! ```
//!
//! # One-off generation
//!
//! ```no_run
//! use std::sync::Arc;
//! use tindergen::image::providers::GeminiProviderFactory;
//! use tindergen::{Credential, GenerationWorkflow, UploadedImage};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = GenerationWorkflow::new(Arc::new(GeminiProviderFactory::new()));
//! let photo = UploadedImage::from_bytes(std::fs::read("me.jpg")?, None)?;
//! let key = Credential::new("my-gemini-key");
//! let image = workflow
//!     .generate("Put me on a sailboat", Some(&photo), key.as_ref())
//!     .await?;
//! image.save("sailboat.png")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod email;
mod error;
pub mod gate;
pub mod image;
pub mod mailing;
pub mod session;
pub mod web;
pub mod workflow;

// Re-export error types at crate root
pub use error::{Result, TinderGenError};

pub use config::ServerConfig;
pub use email::{EmailAddress, ValidationError};
pub use gate::{AccessGate, GateError, GateOutcome};
pub use image::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProvider,
    ImageProviderFactory, ImageProviderKind, UploadedImage,
};
pub use mailing::Subscriber;
pub use session::{Credential, Session, SessionId, SessionStore};
pub use workflow::{GenerationError, GenerationWorkflow, MissingInput, Submission, Upload};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, TinderGenError};
    pub use crate::gate::{AccessGate, GateError};
    pub use crate::image::{GeneratedImage, ImageProvider, ImageProviderFactory, UploadedImage};
    pub use crate::mailing::Subscriber;
    pub use crate::workflow::{GenerationError, GenerationWorkflow};
}
