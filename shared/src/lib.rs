use serde::{Deserialize, Serialize};

pub mod ledger;

pub const INVALID_INPUT_MESSAGE: &str = "Invalid input.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred during verification.";

/// Body of a verification attempt as sent by a client. Both fields are
/// optional here so a missing field is reported as invalid input.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationInput {
    #[serde(default)]
    pub selfie_data_uri: Option<String>,
    #[serde(default)]
    pub stored_image_data_uri: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub is_match: bool,
    pub confidence: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VerificationFailure {
    pub error: String,
}

impl VerificationFailure {
    pub fn invalid_input() -> Self {
        Self {
            error: INVALID_INPUT_MESSAGE.into(),
        }
    }

    pub fn unexpected() -> Self {
        Self {
            error: UNEXPECTED_ERROR_MESSAGE.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum VerificationOutcome {
    Result(VerificationResult),
    Failure(VerificationFailure),
}

/// Progress of a single verification attempt, owned by whoever triggers it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(tag = "state", content = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    #[default]
    NotStarted,
    Pending,
    Completed(VerificationOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateTransitionError {
    AlreadyPending,
    NotPending,
}

impl VerificationState {
    /// Moves to `Pending`. A second attempt cannot start while one is in flight.
    pub fn begin(&mut self) -> Result<(), StateTransitionError> {
        if self.is_pending() {
            return Err(StateTransitionError::AlreadyPending);
        }
        *self = VerificationState::Pending;
        Ok(())
    }

    pub fn complete(&mut self, outcome: VerificationOutcome) -> Result<(), StateTransitionError> {
        if !self.is_pending() {
            return Err(StateTransitionError::NotPending);
        }
        *self = VerificationState::Completed(outcome);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, VerificationState::Pending)
    }

    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        match self {
            VerificationState::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }
}
