use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use super::image_reference::ImageReference;
use super::matcher::{FaceMatcher, MatchVerdict, MatcherError};
use crate::config::GeminiSettings;

const INSTRUCTIONS: &str = "You are an identity verification assistant for a microfinance field \
office. You are given two photographs. The first is a live selfie captured just now. The second \
is the reference photo stored when the borrower registered. Decide whether both photographs show \
the face of the same person. Ignore differences in lighting, background, camera quality, \
glasses, head covering and expression. Reply only with JSON containing isMatch (true when the \
faces belong to the same person) and confidence (a number between 0 and 1 describing how certain \
you are of that decision).";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn verdict_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isMatch": {
                "type": "BOOLEAN",
                "description": "Whether the two faces belong to the same person."
            },
            "confidence": {
                "type": "NUMBER",
                "description": "Confidence in the decision, between 0 and 1."
            }
        },
        "required": ["isMatch", "confidence"],
        "propertyOrdering": ["isMatch", "confidence"]
    })
}

fn build_request<'a>(
    live_image: &'a ImageReference,
    reference_image: &'a ImageReference,
) -> GenerateContentRequest<'a> {
    let parts = vec![
        RequestPart::Text { text: INSTRUCTIONS },
        RequestPart::Text {
            text: "Live selfie:",
        },
        RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: live_image.mime_type(),
                data: live_image.payload(),
            },
        },
        RequestPart::Text {
            text: "Stored reference image:",
        },
        RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: reference_image.mime_type(),
                data: reference_image.payload(),
            },
        },
    ];

    GenerateContentRequest {
        contents: vec![RequestContent { role: "user", parts }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: verdict_schema(),
            temperature: 0.0,
        },
    }
}

// Some model versions wrap JSON output in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn parse_verdict(response: GenerateContentResponse) -> Result<MatchVerdict, MatcherError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason);
        return Err(match reason {
            Some(reason) => MatcherError::Blocked(reason),
            None => MatcherError::EmptyOutput,
        });
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        log::debug!(
            "Model candidate had no text, finish reason: {:?}",
            candidate.finish_reason
        );
        return Err(MatcherError::EmptyOutput);
    }

    let verdict: MatchVerdict = serde_json::from_str(strip_code_fence(&text))?;
    Ok(verdict)
}

/// Face matcher backed by the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiFaceMatcher {
    http_client: HttpClient,
    endpoint: Url,
    api_key: String,
}

impl GeminiFaceMatcher {
    pub fn new(settings: &GeminiSettings) -> Result<Self, MatcherError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let endpoint = Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            settings.base_url.trim_end_matches('/'),
            settings.model
        ))?;

        Ok(Self {
            http_client,
            endpoint,
            api_key: settings.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl FaceMatcher for GeminiFaceMatcher {
    async fn compare(
        &self,
        live_image: &ImageReference,
        reference_image: &ImageReference,
    ) -> Result<MatchVerdict, MatcherError> {
        let body = build_request(live_image, reference_image);

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(MatcherError::ServiceError {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        parse_verdict(payload)
    }
}
