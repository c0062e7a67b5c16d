use serde::{Deserialize, Serialize};

pub(super) const DEFAULT_API_BASE: &str = "https://api.deepseek.com";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(super) enum Role {
    System,
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Debug)]
pub(super) struct ChatMessage<'m> {
    pub role: Role,
    pub content: &'m str,
}

/* Structures to serialize /chat/completions */

#[derive(Serialize, Debug)]
pub(super) struct ChatCompletionRequest<'o> {
    pub model: &'o str,
    pub messages: Vec<ChatMessage<'o>>,
    pub stream: bool,
    pub max_tokens: u32,
}

/* Structures to deserialize /chat/completions */

#[derive(Deserialize, Debug)]
pub(super) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(super) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
pub(super) struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
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
