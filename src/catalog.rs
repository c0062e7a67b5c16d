//! The catalog is the static registry of models, providers and tools. It is loaded
//! once at startup and is read-only afterwards.
//!
//! The backing document has three maps:
//! ```json
//! {
//!   "models":    { "<model id>":    { "name", "provider", "max_tokens", ... } },
//!   "providers": { "<provider id>": { "name", "credential", "api_key_help", ... } },
//!   "tools":     { "<tool id>":     { "name", "default_model", "supported_models", ... } }
//! }
//! ```
//!
//! Loading fails when the document cannot be read or parsed, or when it is not
//! referentially sound: every model must name a known provider, every tool must
//! have a non-empty set of known supported models which contains its default, and
//! workflow associations must name known providers.

mod descriptors;

pub use descriptors::{CredentialKind, ModelDescriptor, ProviderDescriptor, ToolDescriptor};

use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// The catalog compiled into the binary, used when no other source is configured.
const BUILTIN_CATALOG: &str = include_str!("catalog/default.json");

#[derive(Error, Debug)]
pub enum CatalogLoadError {
    #[error("failed to read catalog \"{}\": {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch catalog from {url}: {source}")]
    Fetch {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("fetching catalog from {url} returned HTTP {status}")]
    FetchStatus { url: Url, status: u16 },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model \"{model}\" references unknown provider \"{provider}\"")]
    UnknownProvider { model: String, provider: String },
    #[error("tool \"{tool}\" does not list any supported models")]
    NoSupportedModels { tool: String },
    #[error("tool \"{tool}\" references unknown model \"{model}\"")]
    UnknownModel { tool: String, model: String },
    #[error("default model \"{model}\" of tool \"{tool}\" is not one of its supported models")]
    DefaultNotSupported { tool: String, model: String },
    #[error("tool \"{tool}\" associates a workflow with unknown provider \"{provider}\"")]
    UnknownWorkflowProvider { tool: String, provider: String },
}

/// Where the catalog document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Builtin,
    File(PathBuf),
    Url(Url),
}

impl CatalogSource {
    /// Interpret a configured location: http(s) URLs are fetched, anything
    /// else is treated as a path.
    pub fn from_location(location: &str) -> CatalogSource {
        if location.starts_with("http://") || location.starts_with("https://") {
            if let Ok(url) = Url::parse(location) {
                return CatalogSource::Url(url);
            }
        }

        CatalogSource::File(PathBuf::from(location))
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::Builtin => write!(f, "builtin"),
            CatalogSource::File(path) => write!(f, "{}", path.display()),
            CatalogSource::Url(url) => write!(f, "{}", url),
        }
    }
}

#[derive(Deserialize)]
struct CatalogDocument {
    models: BTreeMap<String, ModelDescriptor>,
    providers: BTreeMap<String, ProviderDescriptor>,
    tools: BTreeMap<String, ToolDescriptor>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    models: BTreeMap<String, ModelDescriptor>,
    providers: BTreeMap<String, ProviderDescriptor>,
    tools: BTreeMap<String, ToolDescriptor>,
}

impl Catalog {
    pub async fn load(source: &CatalogSource) -> Result<Catalog, CatalogLoadError> {
        let catalog = match source {
            CatalogSource::Builtin => Self::builtin()?,
            CatalogSource::File(path) => Self::from_file(path)?,
            CatalogSource::Url(url) => Self::fetch(url).await?,
        };

        info!(
            %source,
            models = catalog.models.len(),
            providers = catalog.providers.len(),
            tools = catalog.tools.len(),
            "catalog loaded"
        );

        Ok(catalog)
    }

    pub fn builtin() -> Result<Catalog, CatalogLoadError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Catalog, CatalogLoadError> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&raw)
    }

    pub async fn fetch(url: &Url) -> Result<Catalog, CatalogLoadError> {
        debug!(%url, "fetching catalog");

        let fetch_err = |source| CatalogLoadError::Fetch {
            url: url.clone(),
            source,
        };

        let res = Client::new()
            .get(url.clone())
            .send()
            .await
            .map_err(fetch_err)?;

        let status = res.status();

        if !status.is_success() {
            return Err(CatalogLoadError::FetchStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let raw = res.text().await.map_err(fetch_err)?;

        Self::from_json(&raw)
    }

    pub fn from_json(document: &str) -> Result<Catalog, CatalogLoadError> {
        let doc: CatalogDocument = serde_json::from_str(document)?;

        let mut catalog = Catalog {
            models: doc.models,
            providers: doc.providers,
            tools: doc.tools,
        };

        for (id, model) in catalog.models.iter_mut() {
            model.id = id.clone();
        }
        for (id, provider) in catalog.providers.iter_mut() {
            provider.id = id.clone();
        }
        for (id, tool) in catalog.tools.iter_mut() {
            tool.id = id.clone();
        }

        catalog.check_integrity()?;

        Ok(catalog)
    }

    fn check_integrity(&self) -> Result<(), CatalogLoadError> {
        for model in self.models.values() {
            if !self.providers.contains_key(&model.provider) {
                return Err(CatalogLoadError::UnknownProvider {
                    model: model.id.clone(),
                    provider: model.provider.clone(),
                });
            }
        }

        for tool in self.tools.values() {
            if tool.supported_models.is_empty() {
                return Err(CatalogLoadError::NoSupportedModels {
                    tool: tool.id.clone(),
                });
            }

            for model in tool.supported_models.iter().chain([&tool.default_model]) {
                if !self.models.contains_key(model) {
                    return Err(CatalogLoadError::UnknownModel {
                        tool: tool.id.clone(),
                        model: model.clone(),
                    });
                }
            }

            if !tool.supports(&tool.default_model) {
                return Err(CatalogLoadError::DefaultNotSupported {
                    tool: tool.id.clone(),
                    model: tool.default_model.clone(),
                });
            }

            if let Some(provider) = tool
                .workflows
                .keys()
                .find(|p| !self.providers.contains_key(*p))
            {
                return Err(CatalogLoadError::UnknownWorkflowProvider {
                    tool: tool.id.clone(),
                    provider: provider.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn model(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.models.get(model_id)
    }

    pub fn provider(&self, provider_id: &str) -> Option<&ProviderDescriptor> {
        self.providers.get(provider_id)
    }

    pub fn tool(&self, tool_id: &str) -> Option<&ToolDescriptor> {
        self.tools.get(tool_id)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.values()
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    pub fn models_by_provider<'c>(
        &'c self,
        provider_id: &'c str,
    ) -> impl Iterator<Item = &'c ModelDescriptor> + 'c {
        self.models.values().filter(move |m| m.provider == provider_id)
    }

    /// The models a tool may use. Unknown tools support nothing.
    pub fn supported_models(&self, tool_id: &str) -> &[String] {
        self.tools
            .get(tool_id)
            .map(|t| t.supported_models.as_slice())
            .unwrap_or_default()
    }

    pub fn default_model(&self, tool_id: &str) -> Option<&str> {
        self.tools.get(tool_id).map(|t| t.default_model.as_str())
    }

    pub fn is_model_supported(&self, tool_id: &str, model_id: &str) -> bool {
        self.tools
            .get(tool_id)
            .map(|t| t.supports(model_id))
            .unwrap_or(false)
    }

    /// The provider which serves a model.
    pub fn provider_of(&self, model_id: &str) -> Option<&ProviderDescriptor> {
        self.models
            .get(model_id)
            .and_then(|m| self.providers.get(&m.provider))
    }

    pub fn providers_requiring_secret(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.values().filter(|p| p.requires_secret())
    }

    pub fn local_providers(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.providers.values().filter(|p| p.is_local())
    }

    /// Workflow parameter keys declared by any tool.
    pub fn workflow_keys(&self) -> impl Iterator<Item = &str> {
        self.tools
            .values()
            .flat_map(|t| t.workflows.values().map(|k| k.as_str()))
    }
}
