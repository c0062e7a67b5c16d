//! The provider dispatcher: one end-to-end invocation from a model id (or a tool
//! id) and a list of messages to the generated text.
//!
//! Every precondition is checked before the request is sent, so an unknown model,
//! a missing credential or a missing workflow id never reaches the network. Each
//! call makes at most one request; there is no retry. The dispatcher holds no
//! mutable state of its own, so concurrent calls never interfere.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::chat::Message;
use crate::providers::{
    aggregate, registry, AdapterCall, BuildError, CallOptions, ErrorKind, ResponseFormat,
    Transport,
};
use crate::settings::Settings;

/// The message sent when checking that a model is reachable.
const PROBE_MESSAGE: &str = "Hello, this is a test message.";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unknown model \"{0}\"")]
    UnknownModel(String),
    #[error("unknown tool \"{0}\"")]
    UnknownTool(String),
    #[error("provider \"{0}\" is not supported")]
    UnsupportedProvider(String),
    #[error("no credential is configured for provider \"{0}\"")]
    MissingCredential(String),
    #[error("model \"{0}\" runs a workflow but no workflow id was given")]
    MissingWorkflowId(String),
    #[error("invalid endpoint for provider \"{provider}\": {source}")]
    InvalidEndpoint {
        provider: String,
        #[source]
        source: BuildError,
    },
    #[error("{provider}: {message}")]
    ProviderCallFailed {
        provider: String,
        kind: ErrorKind,
        message: String,
    },
}

impl DispatchError {
    /// The failure category of a provider call, if the call was attempted.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DispatchError::ProviderCallFailed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    fn call_failed<S: ToString>(provider: &str, kind: ErrorKind, message: S) -> DispatchError {
        DispatchError::ProviderCallFailed {
            provider: provider.to_string(),
            kind,
            message: message.to_string(),
        }
    }
}

pub struct Dispatcher {
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(settings: Arc<Settings>, transport: Arc<dyn Transport>) -> Dispatcher {
        Dispatcher {
            settings,
            transport,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Send `messages` to `model_id` and return the generated text.
    pub async fn invoke(
        &self,
        model_id: &str,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<String, DispatchError> {
        let catalog = self.settings.catalog();
        let credentials = self.settings.credentials();

        let model = catalog
            .model(model_id)
            .ok_or_else(|| DispatchError::UnknownModel(model_id.to_string()))?;

        let provider_id = model.provider.as_str();
        let provider = catalog.provider(provider_id);

        let requires_secret = provider.map_or(true, |p| p.requires_secret());
        let is_local = provider.map_or(false, |p| p.is_local());

        if requires_secret && !credentials.is_configured(provider_id) {
            return Err(DispatchError::MissingCredential(provider_id.to_string()));
        }

        let adapter = registry::lookup(provider_id)
            .ok_or_else(|| DispatchError::UnsupportedProvider(provider_id.to_string()))?;

        let (secret, endpoint) = if is_local {
            let local = credentials.get_local_endpoint(provider_id);

            let secret = local
                .secret
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| credentials.get_secret(provider_id));

            (secret, Some(local.url).filter(|url| !url.is_empty()))
        } else {
            (credentials.get_secret(provider_id), None)
        };

        let call = AdapterCall {
            model,
            messages,
            options,
            secret: Some(secret.as_str()).filter(|s| !s.is_empty()),
            endpoint: endpoint.as_deref(),
        };

        let request = adapter.build_request(&call).map_err(|err| match err {
            BuildError::MissingWorkflowId => DispatchError::MissingWorkflowId(model_id.to_string()),
            BuildError::MissingCredential => {
                DispatchError::MissingCredential(provider_id.to_string())
            }
            err @ BuildError::InvalidEndpoint { .. } => DispatchError::InvalidEndpoint {
                provider: provider_id.to_string(),
                source: err,
            },
            err @ BuildError::Encode(_) => {
                DispatchError::call_failed(provider_id, ErrorKind::BadRequest, err)
            }
        })?;

        info!(
            model = model_id,
            provider = provider_id,
            url = %request.redacted_url(),
            "dispatching request"
        );

        let response = self
            .transport
            .post(request)
            .await
            .map_err(|err| DispatchError::call_failed(provider_id, (&err).into(), err))?;

        let status = response.status();

        if !response.is_success() {
            let body = match response.bytes().await {
                Ok(body) => body,
                Err(err) => {
                    debug!(provider = provider_id, status, %err, "failed to read error body");
                    Vec::new()
                }
            };
            let message = adapter.error_message(status, &body);

            debug!(provider = provider_id, status, %message, "provider returned an error");

            return Err(DispatchError::call_failed(
                provider_id,
                ErrorKind::from_status(status),
                message,
            ));
        }

        let text = match adapter.response_format() {
            ResponseFormat::Json => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|err| DispatchError::call_failed(provider_id, (&err).into(), err))?;

                adapter.parse_response(&body).map_err(|message| {
                    DispatchError::call_failed(provider_id, ErrorKind::UnexpectedResponse, message)
                })?
            }
            ResponseFormat::EventStream => aggregate(response.into_stream())
                .await
                .map_err(|err| DispatchError::call_failed(provider_id, (&err).into(), err))?,
        };

        debug!(model = model_id, chars = text.len(), "dispatch complete");

        Ok(text)
    }

    /// Invoke the model bound to `tool_id`. For workflow-style providers, the
    /// tool's configured workflow id is used unless `options` carries one.
    pub async fn invoke_tool(
        &self,
        tool_id: &str,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<String, DispatchError> {
        let model_id = self
            .settings
            .bindings()
            .current_model(tool_id)
            .ok_or_else(|| DispatchError::UnknownTool(tool_id.to_string()))?;

        let mut options = options.clone();

        if options.workflow_id().is_none() {
            let provider_id = self.provider_of(&model_id);

            if let Some(workflow_id) = self.settings.bindings().workflow_for(tool_id, provider_id) {
                debug!(tool = tool_id, %workflow_id, "using configured workflow");
                options.workflow_id = Some(workflow_id);
            }
        }

        self.invoke(&model_id, messages, &options).await
    }

    /// Send a short test message to `model_id` and report whether it succeeded.
    pub async fn probe_model(&self, model_id: &str, options: &CallOptions) -> bool {
        let mut options = options.clone();

        if options.workflow_id().is_none() {
            options.workflow_id = self.any_workflow_for(model_id);
        }

        let messages = [Message::user(PROBE_MESSAGE)];

        match self.invoke(model_id, &messages, &options).await {
            Ok(_) => true,
            Err(err) => {
                debug!(model = model_id, %err, "probe failed");
                false
            }
        }
    }

    /// True if any of the provider's models answers a probe.
    pub async fn probe_provider(&self, provider_id: &str, options: &CallOptions) -> bool {
        let models: Vec<String> = self
            .settings
            .catalog()
            .models_by_provider(provider_id)
            .map(|m| m.id.clone())
            .collect();

        for model_id in models {
            if self.probe_model(&model_id, options).await {
                return true;
            }
        }

        false
    }

    fn provider_of(&self, model_id: &str) -> &str {
        self.settings
            .catalog()
            .model(model_id)
            .map_or("", |m| m.provider.as_str())
    }

    // The first workflow id configured by any tool which supports the model
    fn any_workflow_for(&self, model_id: &str) -> Option<String> {
        let provider_id = self.provider_of(model_id);

        self.settings
            .catalog()
            .tools()
            .filter(|tool| tool.supports(model_id))
            .find_map(|tool| self.settings.bindings().workflow_for(&tool.id, provider_id))
    }
}
