//! The generation workflow: prompt + photo + credential in, one image out.

use crate::error::TinderGenError;
use crate::image::{GeneratedImage, GenerationRequest, ImageProviderFactory, UploadedImage};
use crate::session::{Credential, Session};
use std::fmt;
use std::sync::Arc;

/// Extra line shown when the vendor was unreachable or rate limited.
const RETRY_HINT: &str = "The image service is busy. Please try again in a moment.";

/// An input the user still has to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    /// No prompt, or only whitespace.
    Prompt,
    /// No photo uploaded.
    Image,
    /// No generative API key.
    Credential,
}

impl MissingInput {
    /// The message shown next to the form.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Prompt => "Please enter a prompt to generate an image.",
            Self::Image => "Please upload an image to generate a transformation.",
            Self::Credential => "Please enter your API key to generate an image.",
        }
    }
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Why a generate click produced no image.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The session has not passed the access gate.
    #[error("please enter your email first")]
    Locked,

    /// One or more inputs are missing. All of them are listed.
    #[error("{}", join_missing(.0))]
    MissingInputs(Vec<MissingInput>),

    /// The upload is not a JPEG or PNG.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    /// A previous click in this session has not finished yet.
    #[error("an image is already being generated, please wait for it to finish")]
    InProgress,

    /// The vendor answered without an image.
    #[error("Failed to generate image. Please try again. (no image returned)")]
    NoImageReturned,

    /// Transport, authentication or decoding failure.
    #[error("An error occurred: {0}")]
    Provider(#[source] TinderGenError),
}

impl GenerationError {
    /// Individual user-facing lines, one per problem.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::MissingInputs(missing) => {
                missing.iter().map(|m| m.message().to_string()).collect()
            }
            Self::Provider(e) if e.is_transient() => {
                vec![self.to_string(), RETRY_HINT.to_string()]
            }
            other => vec![other.to_string()],
        }
    }
}

impl From<TinderGenError> for GenerationError {
    fn from(e: TinderGenError) -> Self {
        match e {
            TinderGenError::NoImageReturned => Self::NoImageReturned,
            other => Self::Provider(other),
        }
    }
}

fn join_missing(missing: &[MissingInput]) -> String {
    missing
        .iter()
        .map(MissingInput::message)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reports every missing input at once, or hands back the image and credential.
pub fn check_preconditions<'a>(
    prompt: &str,
    image: Option<&'a UploadedImage>,
    credential: Option<&'a Credential>,
) -> Result<(&'a UploadedImage, &'a Credential), GenerationError> {
    let mut missing = Vec::new();
    if prompt.trim().is_empty() {
        missing.push(MissingInput::Prompt);
    }
    if image.is_none() {
        missing.push(MissingInput::Image);
    }
    if credential.is_none() {
        missing.push(MissingInput::Credential);
    }

    match (image, credential) {
        (Some(image), Some(credential)) if missing.is_empty() => Ok((image, credential)),
        _ => Err(GenerationError::MissingInputs(missing)),
    }
}

/// A raw upload straight from the form.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    /// File bytes. Empty when the picker was left blank.
    pub data: Vec<u8>,
    /// File name reported by the browser.
    pub file_name: Option<String>,
}

/// What a generate click submitted. Empty fields fall back to the session's stored values.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Prompt text as typed.
    pub prompt: String,
    /// Newly picked photo, if any.
    pub upload: Option<Upload>,
    /// Newly typed API key, if any.
    pub credential: Option<String>,
}

/// Sends prompt + photo to the image provider and returns the first image.
#[derive(Clone)]
pub struct GenerationWorkflow {
    factory: Arc<dyn ImageProviderFactory>,
}

impl GenerationWorkflow {
    /// Creates a workflow that builds providers through `factory`.
    pub fn new(factory: Arc<dyn ImageProviderFactory>) -> Self {
        Self { factory }
    }

    /// Runs one generation attempt.
    ///
    /// Preconditions are checked first; if any input is missing no provider is
    /// built and no request is sent.
    pub async fn generate(
        &self,
        prompt: &str,
        image: Option<&UploadedImage>,
        credential: Option<&Credential>,
    ) -> Result<GeneratedImage, GenerationError> {
        let (image, credential) = check_preconditions(prompt, image, credential)?;

        let provider = self.factory.provider(credential.expose())?;
        let request = GenerationRequest::new(prompt.trim(), image.clone());

        match provider.generate(&request).await {
            Ok(generated) => {
                tracing::info!(
                    provider = %generated.provider,
                    size_bytes = generated.size(),
                    duration_ms = generated.metadata.duration_ms,
                    "image generated"
                );
                Ok(generated)
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "image generation failed");
                Err(e.into())
            }
        }
    }

    /// Applies a form submission to `session`, then runs one generation attempt.
    ///
    /// Only one attempt per session may be in flight; an overlapping click gets
    /// [`GenerationError::InProgress`] and leaves the session untouched. Otherwise
    /// the prompt, a valid upload and a typed credential are stored in the session
    /// first, so they survive a failed attempt.
    pub async fn generate_for_session(
        &self,
        session: &Session,
        submission: Submission,
    ) -> Result<GeneratedImage, GenerationError> {
        let (_permit, prompt, image, credential) = {
            let mut state = session.state().await;
            if !state.is_unlocked() {
                return Err(GenerationError::Locked);
            }
            let permit = session
                .try_begin_generation()
                .ok_or(GenerationError::InProgress)?;

            state.set_prompt(submission.prompt.clone());
            if let Some(credential) = submission
                .credential
                .as_deref()
                .and_then(Credential::new)
            {
                state.set_credential(credential);
            }
            if let Some(upload) = submission.upload.filter(|u| !u.data.is_empty()) {
                let image = UploadedImage::from_bytes(upload.data, upload.file_name).map_err(
                    |e| match e {
                        TinderGenError::InvalidRequest(msg) => {
                            GenerationError::UnsupportedImage(msg)
                        }
                        other => GenerationError::UnsupportedImage(other.to_string()),
                    },
                )?;
                state.set_uploaded(image);
            }

            (
                permit,
                state.prompt().to_string(),
                state.uploaded().cloned(),
                state.credential().cloned(),
            )
        };

        self.generate(&prompt, image.as_ref(), credential.as_ref())
            .await
    }
}
