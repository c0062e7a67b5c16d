use crate::chat::Role;
use crate::providers::deepseek::api;
use crate::providers::{
    endpoint_url, status_message, AdapterCall, BuildError, HttpRequest, ProviderAdapter,
    ProviderIdentifier, ResponseFormat,
};

impl From<Role> for api::Role {
    fn from(value: Role) -> Self {
        match value {
            Role::System => api::Role::System,
            Role::User => api::Role::User,
            Role::Assistant => api::Role::Assistant,
        }
    }
}

/// The OpenAI-style `/chat/completions` endpoint, always requested without
/// streaming.
#[derive(Debug, Default)]
pub(crate) struct DeepSeekAdapter;

impl DeepSeekAdapter {
    pub(crate) fn new() -> DeepSeekAdapter {
        DeepSeekAdapter
    }
}

impl ProviderAdapter for DeepSeekAdapter {
    fn id(&self) -> ProviderIdentifier {
        ProviderIdentifier::DeepSeek
    }

    fn response_format(&self) -> ResponseFormat {
        ResponseFormat::Json
    }

    fn build_request(&self, call: &AdapterCall<'_>) -> Result<HttpRequest, BuildError> {
        let secret = call.secret.ok_or(BuildError::MissingCredential)?;

        let base = call.model.api_base.as_deref().unwrap_or(api::DEFAULT_API_BASE);
        let url = endpoint_url(base, "chat/completions")?;

        let messages = call
            .messages
            .iter()
            .map(|m| api::ChatMessage {
                role: m.role.into(),
                content: &m.content,
            })
            .collect();

        let body = serde_json::to_value(api::ChatCompletionRequest {
            model: &call.model.id,
            messages,
            stream: false,
            max_tokens: call.options.max_tokens_for(call.model),
        })?;

        Ok(HttpRequest::post(url, body).bearer_auth(secret))
    }

    fn parse_response(&self, body: &[u8]) -> Result<String, String> {
        let res: api::ChatCompletion = serde_json::from_slice(body)
            .map_err(|err| format!("failed to decode response: {}", err))?;

        let choice = res
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "response contained no choices".to_string())?;

        choice
            .message
            .content
            .ok_or_else(|| "response choice has no message content".to_string())
    }

    fn error_message(&self, status: u16, body: &[u8]) -> String {
        match serde_json::from_slice::<api::ApiErrorResponse>(body) {
            Ok(err) => err.error.message,
            Err(_) => status_message(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::test_catalog;
    use crate::chat::Message;
    use crate::providers::CallOptions;
    use serde_json::json;

    #[test]
    fn test_build_request() {
        let catalog = test_catalog();
        let messages = [Message::system("sys"), Message::user("Hi")];
        let options = CallOptions::default();

        let req = DeepSeekAdapter::new()
            .build_request(&AdapterCall {
                model: catalog.model("m2").unwrap(),
                messages: &messages,
                options: &options,
                secret: Some("sk-0123456789"),
                endpoint: None,
            })
            .unwrap();

        assert_eq!(req.url.as_str(), "https://deepseek.test/chat/completions");
        assert_eq!(req.header_value("Authorization"), Some("Bearer sk-0123456789"));
        assert_eq!(
            req.body,
            json!({
                "model": "m2",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "Hi" },
                ],
                "stream": false,
                "max_tokens": 2048,
            })
        );
    }

    #[test]
    fn test_default_base() {
        let catalog = test_catalog();
        let options = CallOptions::default().with_max_tokens(128);

        let req = DeepSeekAdapter::new()
            .build_request(&AdapterCall {
                model: catalog.model("m3").unwrap(),
                messages: &[],
                options: &options,
                secret: Some("sk-0123456789"),
                endpoint: None,
            })
            .unwrap();

        assert_eq!(req.url.as_str(), "https://api.deepseek.com/chat/completions");
        assert_eq!(req.body["max_tokens"], json!(128));
    }

    #[test]
    fn test_parse_response() {
        let adapter = DeepSeekAdapter::new();

        let body = br#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hello"},"finish_reason":"stop"}]}"#;
        assert_eq!(adapter.parse_response(body).unwrap(), "Hello");

        assert_eq!(
            adapter.parse_response(br#"{"choices":[]}"#).unwrap_err(),
            "response contained no choices"
        );
        assert_eq!(
            adapter
                .parse_response(br#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap_err(),
            "response choice has no message content"
        );
    }

    #[test]
    fn test_error_message() {
        let adapter = DeepSeekAdapter::new();

        let body = br#"{"error":{"message":"Authentication Fails","type":"authentication_error"}}"#;
        assert_eq!(adapter.error_message(401, body), "Authentication Fails");
        assert_eq!(adapter.error_message(500, b""), "HTTP 500");
    }
}
