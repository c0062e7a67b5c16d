use crate::chat::joined_content;
use crate::providers::coze::api;
use crate::providers::{
    endpoint_url, status_message, AdapterCall, BuildError, HttpRequest, ProviderAdapter,
    ProviderIdentifier, ResponseFormat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deployment {
    /// The hosted service. Requires a token.
    Hosted,
    /// A self-hosted instance at a configurable base URL. The token is optional.
    Local,
}

/// Runs a server-side workflow and reads its event stream. The workflow id comes
/// from the call options; the conversation is passed as the `message` input.
#[derive(Debug)]
pub(crate) struct CozeAdapter {
    deployment: Deployment,
}

impl CozeAdapter {
    pub(crate) fn hosted() -> CozeAdapter {
        CozeAdapter {
            deployment: Deployment::Hosted,
        }
    }

    pub(crate) fn local() -> CozeAdapter {
        CozeAdapter {
            deployment: Deployment::Local,
        }
    }

    fn url(&self, call: &AdapterCall<'_>) -> Result<url::Url, BuildError> {
        match self.deployment {
            Deployment::Hosted => {
                let base = call.model.api_base.as_deref().unwrap_or(api::DEFAULT_API_BASE);

                endpoint_url(base, api::HOSTED_PATH)
            }
            Deployment::Local => {
                let base = call
                    .endpoint
                    .filter(|e| !e.is_empty())
                    .unwrap_or(api::LOCAL_DEFAULT_ENDPOINT);

                endpoint_url(base, api::LOCAL_PATH)
            }
        }
    }

    fn parameters(&self, call: &AdapterCall<'_>) -> serde_json::Map<String, serde_json::Value> {
        let mut parameters = call.options.parameters.clone();
        let message = joined_content(call.messages);

        match self.deployment {
            Deployment::Hosted => {
                parameters
                    .entry(api::MESSAGE_PARAMETER)
                    .or_insert_with(|| message.into());
            }
            Deployment::Local => {
                parameters.insert(api::MESSAGE_PARAMETER.to_string(), message.into());
            }
        }

        parameters
    }
}

impl ProviderAdapter for CozeAdapter {
    fn id(&self) -> ProviderIdentifier {
        match self.deployment {
            Deployment::Hosted => ProviderIdentifier::Coze,
            Deployment::Local => ProviderIdentifier::CozeLocal,
        }
    }

    fn response_format(&self) -> ResponseFormat {
        ResponseFormat::EventStream
    }

    fn build_request(&self, call: &AdapterCall<'_>) -> Result<HttpRequest, BuildError> {
        let workflow_id = call
            .options
            .workflow_id()
            .ok_or(BuildError::MissingWorkflowId)?;

        let secret = match (self.deployment, call.secret.filter(|s| !s.is_empty())) {
            (Deployment::Hosted, None) => return Err(BuildError::MissingCredential),
            (_, secret) => secret,
        };

        let url = self.url(call)?;

        let body = serde_json::to_value(api::WorkflowRunRequest {
            workflow_id,
            parameters: self.parameters(call),
        })?;

        let req = HttpRequest::post(url, body).header("Accept", "text/event-stream");

        Ok(match secret {
            Some(secret) => req.bearer_auth(secret),
            None => req,
        })
    }

    fn parse_response(&self, _body: &[u8]) -> Result<String, String> {
        Err("workflow replies are event streams".to_string())
    }

    fn error_message(&self, status: u16, body: &[u8]) -> String {
        match serde_json::from_slice::<api::ApiErrorPayload>(body) {
            Ok(err) => err.msg,
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
    fn test_hosted_request() {
        let catalog = test_catalog();
        let messages = [Message::user("first"), Message::user("second")];
        let options = CallOptions::default()
            .with_workflow_id("wf-123")
            .with_parameter("lang", "en");

        let req = CozeAdapter::hosted()
            .build_request(&AdapterCall {
                model: catalog.model("wf").unwrap(),
                messages: &messages,
                options: &options,
                secret: Some("pat_0123456789"),
                endpoint: None,
            })
            .unwrap();

        assert_eq!(req.url.as_str(), "https://coze.test/v1/workflow/stream_run");
        assert_eq!(req.header_value("Accept"), Some("text/event-stream"));
        assert_eq!(req.header_value("Authorization"), Some("Bearer pat_0123456789"));
        assert_eq!(
            req.body,
            json!({
                "workflow_id": "wf-123",
                "parameters": { "lang": "en", "message": "first\nsecond" },
            })
        );
    }

    #[test]
    fn test_hosted_keeps_caller_message() {
        let catalog = test_catalog();
        let mut model = catalog.model("wf").unwrap().clone();
        model.api_base = None;

        let messages = [Message::user("ignored")];
        let options = CallOptions::default()
            .with_workflow_id("wf-123")
            .with_parameter("message", "explicit");

        let req = CozeAdapter::hosted()
            .build_request(&AdapterCall {
                model: &model,
                messages: &messages,
                options: &options,
                secret: Some("pat_0123456789"),
                endpoint: None,
            })
            .unwrap();

        assert_eq!(req.url.as_str(), "https://api.coze.cn/v1/workflow/stream_run");
        assert_eq!(req.body["parameters"]["message"], json!("explicit"));
    }

    #[test]
    fn test_local_request() {
        let catalog = test_catalog();
        let model = catalog.model("wf-local").unwrap();
        let messages = [Message::user("hello")];
        let options = CallOptions::default()
            .with_workflow_id("local-wf")
            .with_parameter("message", "overwritten");

        let req = CozeAdapter::local()
            .build_request(&AdapterCall {
                model,
                messages: &messages,
                options: &options,
                secret: None,
                endpoint: None,
            })
            .unwrap();

        assert_eq!(
            req.url.as_str(),
            "http://localhost:8080/api/v1/workflow/stream_run"
        );
        assert_eq!(req.header_value("Authorization"), None);
        assert_eq!(req.body["parameters"]["message"], json!("hello"));

        let req = CozeAdapter::local()
            .build_request(&AdapterCall {
                model,
                messages: &messages,
                options: &options,
                secret: Some("local-token"),
                endpoint: Some("http://10.0.0.5:9000/"),
            })
            .unwrap();

        assert_eq!(
            req.url.as_str(),
            "http://10.0.0.5:9000/api/v1/workflow/stream_run"
        );
        assert_eq!(req.header_value("Authorization"), Some("Bearer local-token"));
    }

    #[test]
    fn test_workflow_id_required() {
        let catalog = test_catalog();

        for options in [CallOptions::default(), CallOptions::default().with_workflow_id("")] {
            let result = CozeAdapter::local().build_request(&AdapterCall {
                model: catalog.model("wf-local").unwrap(),
                messages: &[],
                options: &options,
                secret: None,
                endpoint: None,
            });

            assert!(matches!(result, Err(BuildError::MissingWorkflowId)));
        }
    }

    #[test]
    fn test_invalid_endpoint() {
        let catalog = test_catalog();
        let options = CallOptions::default().with_workflow_id("wf");

        let result = CozeAdapter::local().build_request(&AdapterCall {
            model: catalog.model("wf-local").unwrap(),
            messages: &[],
            options: &options,
            secret: None,
            endpoint: Some("localhost without scheme"),
        });

        assert!(matches!(result, Err(BuildError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_error_message() {
        let adapter = CozeAdapter::hosted();

        assert_eq!(
            adapter.error_message(400, br#"{"code":4000,"msg":"workflow not found"}"#),
            "workflow not found"
        );
        assert_eq!(adapter.error_message(503, b"unavailable"), "HTTP 503");
    }
}
