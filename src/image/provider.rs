//! Image provider traits.

use crate::error::Result;
use crate::image::types::{GeneratedImage, GenerationRequest, ImageProviderKind};
use async_trait::async_trait;

/// Trait for image generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates an image from the given request.
    ///
    /// One call is one vendor request. Implementations never retry.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;

    /// Returns the kind of this provider.
    fn kind(&self) -> ImageProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            ImageProviderKind::Gemini => "Gemini (Google)",
        }
    }
}

/// Builds a provider for a user-supplied credential.
///
/// The generative credential belongs to a session, so providers are built per request
/// instead of once at startup.
pub trait ImageProviderFactory: Send + Sync {
    /// Creates a provider authenticated with `credential`.
    fn provider(&self, credential: &str) -> Result<Box<dyn ImageProvider>>;
}
