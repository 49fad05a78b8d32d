//! Image generation providers.

mod gemini;

pub use gemini::{
    GeminiModel, GeminiProvider, GeminiProviderBuilder, GeminiProviderFactory, DEFAULT_BASE_URL,
};
