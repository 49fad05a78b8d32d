//! Image generation module.

mod provider;
pub mod providers;
pub(crate) mod types;

pub use provider::{ImageProvider, ImageProviderFactory};
pub use types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProviderKind,
    UploadedImage,
};
