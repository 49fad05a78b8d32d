//! Transforms a local photo through the same workflow the web form uses.
//!
//! Run with: `cargo run --example generate_image -- <photo.jpg> "<prompt>"`
//!
//! Requires `GOOGLE_API_KEY` environment variable.

use std::sync::Arc;
use tindergen::image::providers::GeminiProviderFactory;
use tindergen::{Credential, GenerationWorkflow, UploadedImage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let input_path = args
        .next()
        .expect("Usage: generate_image <photo.jpg> <prompt>");
    let prompt = args
        .next()
        .unwrap_or_else(|| "Put me on a sailboat at golden hour".to_string());

    let photo = UploadedImage::from_bytes(std::fs::read(&input_path)?, None)?;
    let key = std::env::var("GOOGLE_API_KEY")
        .ok()
        .and_then(|k| Credential::new(&k));

    let workflow = GenerationWorkflow::new(Arc::new(GeminiProviderFactory::new()));
    let image = workflow.generate(&prompt, Some(&photo), key.as_ref()).await?;

    let output = format!("generated.{}", image.format.extension());
    image.save(&output)?;
    println!("Generated image saved to {} ({} bytes)", output, image.size());

    Ok(())
}
