use std::sync::Arc;

use shared::{VerificationFailure, VerificationInput, VerificationOutcome, VerificationResult};

use super::image_reference::{ImageReference, ImageReferenceError};
use super::matcher::{FaceMatcher, MatcherError};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid {field}: {source}")]
    InvalidImage {
        field: &'static str,
        source: ImageReferenceError,
    },
}

/// A validated verification attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub live_image: ImageReference,
    pub reference_image: ImageReference,
}

fn required_image(value: Option<String>, field: &'static str) -> Result<ImageReference, InputError> {
    let value = value.ok_or(InputError::MissingField(field))?;
    ImageReference::parse(&value).map_err(|source| InputError::InvalidImage { field, source })
}

impl TryFrom<VerificationInput> for VerificationRequest {
    type Error = InputError;

    fn try_from(input: VerificationInput) -> Result<Self, Self::Error> {
        Ok(Self {
            live_image: required_image(input.selfie_data_uri, "selfieDataUri")?,
            reference_image: required_image(input.stored_image_data_uri, "storedImageDataUri")?,
        })
    }
}

/// Validates a pair of images and asks the face matcher for a decision.
/// Holds no state between calls.
#[derive(Clone)]
pub struct VerificationHandler {
    matcher: Arc<dyn FaceMatcher>,
}

/// Why a verification attempt produced no verdict.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),
    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

impl VerificationError {
    /// The client-facing failure. Underlying detail is never exposed.
    pub fn failure(&self) -> VerificationFailure {
        match self {
            VerificationError::InvalidInput(_) => VerificationFailure::invalid_input(),
            VerificationError::Matcher(_) => VerificationFailure::unexpected(),
        }
    }
}

impl VerificationHandler {
    pub fn new(matcher: Arc<dyn FaceMatcher>) -> Self {
        Self { matcher }
    }

    pub async fn verify(&self, input: VerificationInput) -> VerificationOutcome {
        match self.try_verify(input).await {
            Ok(result) => VerificationOutcome::Result(result),
            Err(e) => VerificationOutcome::Failure(e.failure()),
        }
    }

    /// Like [`verify`](Self::verify) but keeps the failure kind, so callers
    /// can tell rejected input from a failed matcher call.
    pub async fn try_verify(
        &self,
        input: VerificationInput,
    ) -> Result<VerificationResult, VerificationError> {
        let request = VerificationRequest::try_from(input).inspect_err(|e| {
            log::warn!("Rejected verification input: {}", e);
        })?;

        let verdict = self
            .matcher
            .compare(&request.live_image, &request.reference_image)
            .await
            .inspect_err(|e| {
                log::error!(
                    "Face verification failed (live image {}, reference image {}): {}",
                    request.live_image.digest(),
                    request.reference_image.digest(),
                    e
                );
            })?;

        log::info!(
            "Face verification completed: is_match={}, confidence={}",
            verdict.is_match,
            verdict.confidence
        );
        Ok(VerificationResult {
            is_match: verdict.is_match,
            confidence: verdict.confidence,
        })
    }
}
