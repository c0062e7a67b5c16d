use crate::chat::Role;
use crate::providers::google::api;
use crate::providers::{
    endpoint_url, status_message, AdapterCall, BuildError, HttpRequest, ProviderAdapter,
    ProviderIdentifier, ResponseFormat,
};

/// Gemini's `generateContent`: JSON in, JSON out, authenticated by a `key`
/// query parameter.
#[derive(Debug, Default)]
pub(crate) struct GoogleAdapter;

impl GoogleAdapter {
    pub(crate) fn new() -> GoogleAdapter {
        GoogleAdapter
    }

    fn request_body(call: &AdapterCall<'_>) -> api::GenerateContentRequest {
        let mut contents = Vec::new();
        let mut system = Vec::new();

        for message in call.messages {
            let role = match message.role {
                Role::System => {
                    system.push(api::Part {
                        text: message.content.clone(),
                    });
                    continue;
                }
                Role::User => api::Role::User,
                Role::Assistant => api::Role::Model,
            };

            contents.push(api::Content {
                role,
                parts: vec![api::Part {
                    text: message.content.clone(),
                }],
            });
        }

        let system_instruction = if system.is_empty() {
            None
        } else {
            Some(api::SystemInstruction { parts: system })
        };

        let generation_config = call.options.max_tokens.map(|_| api::GenerationConfig {
            max_output_tokens: call.options.max_tokens_for(call.model),
        });

        api::GenerateContentRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }
}

impl ProviderAdapter for GoogleAdapter {
    fn id(&self) -> ProviderIdentifier {
        ProviderIdentifier::Google
    }

    fn response_format(&self) -> ResponseFormat {
        ResponseFormat::Json
    }

    fn build_request(&self, call: &AdapterCall<'_>) -> Result<HttpRequest, BuildError> {
        let secret = call.secret.ok_or(BuildError::MissingCredential)?;

        let base = call.model.api_base.as_deref().unwrap_or(api::DEFAULT_API_BASE);

        let mut url = endpoint_url(
            base,
            &format!("models/{}:generateContent", call.model.id),
        )?;

        url.query_pairs_mut().append_pair("key", secret);

        let body = serde_json::to_value(Self::request_body(call))?;

        Ok(HttpRequest::post(url, body))
    }

    fn parse_response(&self, body: &[u8]) -> Result<String, String> {
        let res: api::GenerateContentResponse = serde_json::from_slice(body)
            .map_err(|err| format!("failed to decode response: {}", err))?;

        res.first_text()
            .ok_or_else(|| "response contained no candidates".to_string())
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
        let model = catalog.model("m1").unwrap();

        let messages = [
            Message::system("Be brief."),
            Message::user("Hi"),
            Message::assistant("Hello!"),
            Message::user("Bye"),
        ];
        let options = CallOptions::default();

        let req = GoogleAdapter::new()
            .build_request(&AdapterCall {
                model,
                messages: &messages,
                options: &options,
                secret: Some("AIza-secret"),
                endpoint: None,
            })
            .unwrap();

        assert_eq!(
            req.url.as_str(),
            "https://gemini.test/v1beta/models/m1:generateContent?key=AIza-secret"
        );
        assert_eq!(req.redacted_url(), "https://gemini.test/v1beta/models/m1:generateContent");
        assert_eq!(req.header_value("Authorization"), None);
        assert_eq!(
            req.body,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Hi" }] },
                    { "role": "model", "parts": [{ "text": "Hello!" }] },
                    { "role": "user", "parts": [{ "text": "Bye" }] },
                ],
                "systemInstruction": { "parts": [{ "text": "Be brief." }] },
            })
        );
    }

    #[test]
    fn test_default_base_and_token_budget() {
        let catalog = test_catalog();
        let mut model = catalog.model("m1").unwrap().clone();
        model.api_base = None;

        let messages = [Message::user("Hi")];
        let options = CallOptions::default().with_max_tokens(100_000);

        let req = GoogleAdapter::new()
            .build_request(&AdapterCall {
                model: &model,
                messages: &messages,
                options: &options,
                secret: Some("k"),
                endpoint: None,
            })
            .unwrap();

        assert!(req
            .url
            .as_str()
            .starts_with("https://generativelanguage.googleapis.com/v1beta/models/m1:generateContent"));
        assert_eq!(req.body["generationConfig"]["maxOutputTokens"], json!(8192));
        assert!(req.body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_missing_secret() {
        let catalog = test_catalog();
        let options = CallOptions::default();

        let result = GoogleAdapter::new().build_request(&AdapterCall {
            model: catalog.model("m1").unwrap(),
            messages: &[],
            options: &options,
            secret: None,
            endpoint: None,
        });

        assert!(matches!(result, Err(BuildError::MissingCredential)));
    }

    #[test]
    fn test_parse_response() {
        let adapter = GoogleAdapter::new();

        let body = br#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hi!"},{"text":"ignored"}]}}]}"#;
        assert_eq!(adapter.parse_response(body).unwrap(), "Hi!");

        assert!(adapter.parse_response(br#"{"candidates":[]}"#).is_err());
        assert!(adapter.parse_response(b"<html>").is_err());
    }

    #[test]
    fn test_error_message() {
        let adapter = GoogleAdapter::new();

        let body = br#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(adapter.error_message(400, body), "API key not valid.");
        assert_eq!(adapter.error_message(502, b"Bad Gateway"), "HTTP 502");
    }
}
