//! Per-provider secrets and local endpoint configuration.
//!
//! Secrets live under `secret.<provider>`; local endpoint configuration is a JSON
//! object under `endpoint.<provider>`. Every write goes straight through to the
//! backing [`KeyValueStore`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{Catalog, CredentialKind};
use crate::providers::ProviderIdentifier;
use crate::store::{
    decode_snapshot, KeyValueStore, KeyValueStoreExt, SnapshotError, StoreError,
};

const SECRET_PREFIX: &str = "secret.";
const ENDPOINT_PREFIX: &str = "endpoint.";

/// Where a locally deployed provider is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEndpoint {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// A partial update of a [`LocalEndpoint`]. Fields left as `None` keep their
/// stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointUpdate {
    pub url: Option<String>,
    pub secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretValidation {
    pub valid: bool,
    pub reason: String,
}

impl SecretValidation {
    fn valid() -> SecretValidation {
        SecretValidation {
            valid: true,
            reason: "format looks correct".to_string(),
        }
    }

    fn invalid<S: Into<String>>(reason: S) -> SecretValidation {
        SecretValidation {
            valid: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub configured: bool,
    pub has_secret: bool,
    /// Whether an endpoint is stored. Only reported for local providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_endpoint: Option<bool>,
}

/// Every stored credential, for backup and restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialSnapshot {
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
    #[serde(default)]
    pub local_endpoints: BTreeMap<String, LocalEndpoint>,
}

pub struct CredentialStore {
    catalog: Arc<Catalog>,
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn KeyValueStore>) -> CredentialStore {
        CredentialStore { catalog, store }
    }

    /// Store the secret for `provider_id`, replacing any previous value. An empty
    /// secret is stored as given and leaves the provider unconfigured.
    pub fn set_secret(&self, provider_id: &str, secret: &str) -> Result<(), StoreError> {
        self.store.set(&secret_key(provider_id), secret)?;

        info!(provider = provider_id, "secret updated");

        Ok(())
    }

    /// The stored secret, or an empty string.
    pub fn get_secret(&self, provider_id: &str) -> String {
        self.store
            .get(&secret_key(provider_id))
            .unwrap_or_default()
    }

    /// Merge `update` into the stored endpoint configuration.
    pub fn set_local_endpoint(
        &self,
        provider_id: &str,
        update: EndpointUpdate,
    ) -> Result<LocalEndpoint, StoreError> {
        let mut endpoint = self.get_local_endpoint(provider_id);

        if let Some(url) = update.url {
            endpoint.url = url;
        }

        if let Some(secret) = update.secret {
            endpoint.secret = Some(secret);
        }

        self.store.set_json(&endpoint_key(provider_id), &endpoint)?;

        info!(provider = provider_id, url = %endpoint.url, "local endpoint updated");

        Ok(endpoint)
    }

    /// The stored endpoint configuration. An absent entry reads as an empty URL.
    pub fn get_local_endpoint(&self, provider_id: &str) -> LocalEndpoint {
        self.store
            .get_json(&endpoint_key(provider_id))
            .unwrap_or_default()
    }

    /// Local providers are configured by a non-empty endpoint; hosted providers by
    /// a non-empty secret. Providers without credentials are always configured.
    pub fn is_configured(&self, provider_id: &str) -> bool {
        let kind = self
            .catalog
            .provider(provider_id)
            .map(|p| p.credential)
            .unwrap_or_default();

        match kind {
            CredentialKind::LocalEndpoint => !self.get_local_endpoint(provider_id).url.is_empty(),
            CredentialKind::ApiKey => !self.get_secret(provider_id).is_empty(),
            CredentialKind::None => true,
        }
    }

    /// A syntactic check of `candidate`. This never contacts the provider, so a
    /// valid result does not mean the secret works.
    pub fn validate_secret(&self, provider_id: &str, candidate: &str) -> SecretValidation {
        if candidate.is_empty() {
            return SecretValidation::invalid("secret must not be empty");
        }

        let min_len = ProviderIdentifier::from_str(provider_id)
            .ok()
            .and_then(|id| id.min_secret_len());

        match min_len {
            Some(min_len) if candidate.chars().count() < min_len => SecretValidation::invalid(
                format!("{} secret is malformed (too short)", provider_id),
            ),
            _ => SecretValidation::valid(),
        }
    }

    pub fn status(&self) -> BTreeMap<String, CredentialStatus> {
        self.catalog
            .providers()
            .map(|provider| {
                let has_endpoint = provider
                    .is_local()
                    .then(|| !self.get_local_endpoint(&provider.id).url.is_empty());

                let status = CredentialStatus {
                    configured: self.is_configured(&provider.id),
                    has_secret: !self.get_secret(&provider.id).is_empty(),
                    has_endpoint,
                };

                (provider.id.clone(), status)
            })
            .collect()
    }

    /// Remove every stored secret and endpoint.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.store.remove_prefix(SECRET_PREFIX)?;
        self.store.remove_prefix(ENDPOINT_PREFIX)?;

        info!("all credentials cleared");

        Ok(())
    }

    pub fn export(&self) -> CredentialSnapshot {
        let secrets = self
            .store
            .keys_with_prefix(SECRET_PREFIX)
            .into_iter()
            .filter_map(|p| {
                let secret = self.store.get(&secret_key(&p))?;
                Some((p, secret))
            })
            .collect();

        let local_endpoints = self
            .store
            .keys_with_prefix(ENDPOINT_PREFIX)
            .into_iter()
            .filter_map(|p| {
                let endpoint = self.store.get_json(&endpoint_key(&p))?;
                Some((p, endpoint))
            })
            .collect();

        CredentialSnapshot {
            secrets,
            local_endpoints,
        }
    }

    /// Replace every stored credential with the contents of `snapshot`.
    pub fn import(&self, snapshot: &CredentialSnapshot) -> Result<(), StoreError> {
        self.clear_all()?;

        for (provider_id, secret) in &snapshot.secrets {
            self.store.set(&secret_key(provider_id), secret)?;
        }

        for (provider_id, endpoint) in &snapshot.local_endpoints {
            self.store.set_json(&endpoint_key(provider_id), endpoint)?;
        }

        debug!(
            secrets = snapshot.secrets.len(),
            endpoints = snapshot.local_endpoints.len(),
            "credentials imported"
        );

        Ok(())
    }

    pub fn export_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Parse `document` and import it. Nothing is written unless it parses.
    pub fn import_json(&self, document: &str) -> Result<(), SnapshotError> {
        let snapshot: CredentialSnapshot =
            decode_snapshot(document, &["secrets", "local_endpoints"])?;

        Ok(self.import(&snapshot)?)
    }
}

fn secret_key(provider_id: &str) -> String {
    format!("{}{}", SECRET_PREFIX, provider_id)
}

fn endpoint_key(provider_id: &str) -> String {
    format!("{}{}", ENDPOINT_PREFIX, provider_id)
}
