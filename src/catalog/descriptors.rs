//! Descriptor types deserialized from the catalog document. Identifiers are the
//! keys of the document's maps; they are copied into each descriptor after parsing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a provider authenticates.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CredentialKind {
    /// A hosted API which requires a secret (API key or token).
    #[default]
    ApiKey,
    /// A locally deployed service addressed by a configurable base URL. The
    /// secret is optional.
    LocalEndpoint,
    /// No credential is needed.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    #[serde(skip_deserializing)]
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// The maximum number of tokens the model may generate.
    pub max_tokens: u32,
    #[serde(default)]
    pub supports_streaming: bool,
    /// Overrides the adapter's default base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    #[serde(skip_deserializing)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub credential: CredentialKind,
    #[serde(default)]
    pub api_key_help: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_url: Option<String>,
}

impl ProviderDescriptor {
    pub fn requires_secret(&self) -> bool {
        matches!(self.credential, CredentialKind::ApiKey)
    }

    pub fn is_local(&self) -> bool {
        matches!(self.credential, CredentialKind::LocalEndpoint)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(skip_deserializing)]
    pub id: String,
    pub name: String,
    pub default_model: String,
    pub supported_models: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Provider id → workflow parameter key. Workflow-style providers read
    /// the workflow id for this tool from the named parameter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub workflows: BTreeMap<String, String>,
}

impl ToolDescriptor {
    pub fn supports(&self, model_id: &str) -> bool {
        self.supported_models.iter().any(|m| m == model_id)
    }
}
