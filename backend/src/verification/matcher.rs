use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::image_reference::ImageReference;

/// Decision produced by a face matcher. Both fields always arrive together.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchVerdict {
    pub is_match: bool,
    pub confidence: f64,
}

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Model service returned {status}: {body}")]
    ServiceError { status: u16, body: String },
    #[error("Model blocked the prompt: {0}")]
    Blocked(String),
    #[error("Model returned no structured output")]
    EmptyOutput,
    #[error("Structured output does not match the verdict schema: {0}")]
    SchemaMismatch(#[from] serde_json::Error),
}

/// Compares a live capture against a stored reference image.
#[async_trait]
pub trait FaceMatcher: Send + Sync {
    async fn compare(
        &self,
        live_image: &ImageReference,
        reference_image: &ImageReference,
    ) -> Result<MatchVerdict, MatcherError>;
}
