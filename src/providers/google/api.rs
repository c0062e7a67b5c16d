use serde::{Deserialize, Serialize};

pub(super) const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(super) enum Role {
    User,
    Model,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub(super) struct Part {
    #[serde(default)]
    pub text: String,
}

/* Structures to serialize :generateContent */

#[derive(Serialize, Debug)]
pub(super) struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
pub(super) struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerationConfig {
    pub max_output_tokens: u32,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/* Structures to deserialize :generateContent */

#[derive(Deserialize, Debug, Default)]
pub(super) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
pub(super) struct Candidate {
    #[serde(default)]
    pub content: CandidateContent,
}

#[derive(Deserialize, Debug)]
pub(super) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    pub(super) fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()
            .map(|part| part.text)
    }
}

/* API Errors */

#[derive(Deserialize, Debug)]
pub(super) struct ApiErrorPayload {
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub(super) struct ApiErrorResponse {
    pub error: ApiErrorPayload,
}
