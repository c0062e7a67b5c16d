//! A facade bundling the catalog, the credential store and the binding resolver.
//! It is constructed once and passed explicitly to everything which needs it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::bindings::{BindingSnapshot, ToolBindings, ToolStatus};
use crate::catalog::{Catalog, CredentialKind};
use crate::credentials::{CredentialSnapshot, CredentialStatus, CredentialStore};
use crate::store::{decode_snapshot, KeyValueStore, SnapshotError, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsStatus {
    pub providers: BTreeMap<String, CredentialStatus>,
    pub tools: BTreeMap<String, ToolStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfiguredTool {
    pub tool_id: String,
    pub tool_name: String,
    pub current_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completeness {
    pub providers: f64,
    pub tools: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsSummary {
    pub configured_providers: Vec<String>,
    pub configured_tools: Vec<ConfiguredTool>,
    pub total_providers: usize,
    pub total_tools: usize,
    pub completeness: Completeness,
    /// At least half of all providers and tools are configured.
    pub is_complete: bool,
}

/// Everything [`Settings::export_all`] produces. Either half may be omitted on
/// import, in which case it is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings: Option<BindingSnapshot>,
}

pub struct Settings {
    catalog: Arc<Catalog>,
    credentials: CredentialStore,
    bindings: ToolBindings,
}

impl Settings {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn KeyValueStore>) -> Settings {
        Settings {
            credentials: CredentialStore::new(catalog.clone(), store.clone()),
            bindings: ToolBindings::new(catalog.clone(), store),
            catalog,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn bindings(&self) -> &ToolBindings {
        &self.bindings
    }

    pub fn status(&self) -> SettingsStatus {
        SettingsStatus {
            providers: self.credentials.status(),
            tools: self.bindings.status(),
        }
    }

    /// Malformed secrets and invalid bindings are errors; missing secrets and
    /// endpoints are warnings.
    pub fn validate_all(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for provider in self.catalog.providers() {
            match provider.credential {
                CredentialKind::LocalEndpoint => {
                    if self.credentials.get_local_endpoint(&provider.id).url.is_empty() {
                        report
                            .warnings
                            .push(format!("{}: no endpoint configured", provider.id));
                    }
                }
                CredentialKind::ApiKey => {
                    let secret = self.credentials.get_secret(&provider.id);

                    if secret.is_empty() {
                        report
                            .warnings
                            .push(format!("{}: no secret configured", provider.id));
                        continue;
                    }

                    let validation = self.credentials.validate_secret(&provider.id, &secret);

                    if !validation.valid {
                        report
                            .errors
                            .push(format!("{}: {}", provider.id, validation.reason));
                    }
                }
                CredentialKind::None => {}
            }
        }

        // The stored value, since current_model already hides a stale binding
        for tool in self.catalog.tools() {
            let validation = match self.bindings.stored_model(&tool.id) {
                Some(model_id) => self.bindings.validate(&tool.id, &model_id),
                None => continue,
            };

            if !validation.valid {
                report
                    .errors
                    .push(format!("{}: {}", tool.id, validation.message));
            }
        }

        report
    }

    pub fn summary(&self) -> SettingsSummary {
        let configured_providers: Vec<String> = self
            .catalog
            .providers()
            .filter(|p| self.credentials.is_configured(&p.id))
            .map(|p| p.id.clone())
            .collect();

        let configured_tools: Vec<ConfiguredTool> = self
            .catalog
            .tools()
            .filter_map(|tool| {
                Some(ConfiguredTool {
                    current_model: self.bindings.current_model(&tool.id)?,
                    tool_id: tool.id.clone(),
                    tool_name: tool.name.clone(),
                })
            })
            .collect();

        let total_providers = self.catalog.providers().count();
        let total_tools = self.catalog.tools().count();

        let completeness = Completeness {
            providers: ratio(configured_providers.len(), total_providers),
            tools: ratio(configured_tools.len(), total_tools),
            overall: ratio(
                configured_providers.len() + configured_tools.len(),
                total_providers + total_tools,
            ),
        };

        SettingsSummary {
            is_complete: completeness.overall >= 0.5,
            configured_providers,
            configured_tools,
            total_providers,
            total_tools,
            completeness,
        }
    }

    pub fn export_all(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            credentials: Some(self.credentials.export()),
            bindings: Some(self.bindings.export()),
        }
    }

    pub fn import_all(&self, snapshot: &SettingsSnapshot) -> Result<(), StoreError> {
        if let Some(credentials) = &snapshot.credentials {
            self.credentials.import(credentials)?;
        }

        if let Some(bindings) = &snapshot.bindings {
            self.bindings.import(bindings)?;
        }

        info!("settings imported");

        Ok(())
    }

    pub fn export_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(&self.export_all())?)
    }

    /// Parse `document` and import it. Nothing is written unless the whole
    /// document parses.
    pub fn import_json(&self, document: &str) -> Result<(), SnapshotError> {
        let snapshot: SettingsSnapshot = decode_snapshot(document, &["credentials", "bindings"])?;

        Ok(self.import_all(&snapshot)?)
    }

    /// Clear every credential and point every tool back at its default model.
    /// Workflow parameters are kept.
    pub fn reset_all(&self) -> Result<(), StoreError> {
        self.credentials.clear_all()?;
        self.bindings.reset_all()
    }
}

// An empty category counts as fully configured.
fn ratio(configured: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        configured as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::test_catalog;
    use crate::credentials::EndpointUpdate;
    use crate::store::MemoryStore;

    fn settings() -> Settings {
        Settings::new(Arc::new(test_catalog()), Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_validate_all() {
        let settings = settings();

        settings.credentials().set_secret("google", "too-short").unwrap();
        settings
            .credentials()
            .set_secret("deepseek", "sk-0123456789")
            .unwrap();

        let report = settings.validate_all();

        assert_eq!(report.errors, ["google: google secret is malformed (too short)"]);
        assert_eq!(
            report.warnings,
            [
                "acme: no secret configured",
                "coze: no secret configured",
                "coze-local: no endpoint configured",
            ]
        );
        assert!(!report.is_ok());
    }

    #[test]
    fn test_summary() {
        let settings = settings();

        // Six providers ("open" needs nothing), two tools
        let summary = settings.summary();
        assert_eq!(summary.configured_providers, ["open"]);
        assert_eq!(summary.configured_tools.len(), 2);
        assert_eq!(summary.total_providers, 6);
        assert_eq!(summary.total_tools, 2);
        assert_eq!(summary.completeness.tools, 1.0);
        assert_eq!(summary.completeness.overall, 3.0 / 8.0);
        assert!(!summary.is_complete);

        settings.credentials().set_secret("google", "g").unwrap();
        settings
            .credentials()
            .set_local_endpoint(
                "coze-local",
                EndpointUpdate {
                    url: Some("http://localhost:8080".to_string()),
                    secret: None,
                },
            )
            .unwrap();

        let summary = settings.summary();
        assert_eq!(summary.configured_providers, ["coze-local", "google", "open"]);
        assert_eq!(summary.completeness.providers, 0.5);
        assert!(summary.is_complete);
    }

    #[test]
    fn test_export_import_round_trip() {
        let settings = settings();

        settings
            .credentials()
            .set_secret("deepseek", "sk-0123456789")
            .unwrap();
        settings.bindings().set_model("ai-chat", "m2").unwrap();
        settings
            .bindings()
            .set_workflow_parameter("review-workflow-id", "wf-1")
            .unwrap();

        let exported = settings.export_json().unwrap();

        let other = self::settings();
        other.import_json(&exported).unwrap();

        assert_eq!(other.export_json().unwrap(), exported);
        assert_eq!(other.export_all(), settings.export_all());
    }

    #[test]
    fn test_partial_import() {
        let settings = settings();

        settings.credentials().set_secret("google", "kept").unwrap();
        settings.bindings().set_model("ai-chat", "m2").unwrap();

        settings
            .import_json(r#"{"bindings": {"tool_models": {"review": "m2"}}}"#)
            .unwrap();

        assert_eq!(settings.credentials().get_secret("google"), "kept");
        assert_eq!(settings.bindings().current_model("ai-chat").as_deref(), Some("m1"));
        assert_eq!(settings.bindings().current_model("review").as_deref(), Some("m2"));

        assert!(matches!(
            settings.import_json(r#"{"credentials": []}"#),
            Err(SnapshotError::NotAnObject(_))
        ));
        assert!(matches!(
            settings.import_json(r#"{"credentials": {"apiKeys": {"google": "replaced"}}}"#),
            Err(SnapshotError::Parse(_))
        ));
        assert!(matches!(
            settings.import_json(r#"{"apiKeys": {"google": "replaced"}}"#),
            Err(SnapshotError::Parse(_))
        ));
        assert!(matches!(
            settings.import_json(r#"[{"credentials": {}}]"#),
            Err(SnapshotError::NotAnObject(_))
        ));

        assert_eq!(settings.credentials().get_secret("google"), "kept");
        assert_eq!(settings.bindings().current_model("review").as_deref(), Some("m2"));
    }

    #[test]
    fn test_stale_binding_reported() {
        let store = Arc::new(MemoryStore::new());
        let settings = Settings::new(Arc::new(test_catalog()), store.clone());

        store.set("binding.ai-chat", "m3").unwrap();

        let report = settings.validate_all();

        assert_eq!(
            report.errors,
            ["ai-chat: model \"m3\" is not supported by \"ai-chat\""]
        );
        assert_eq!(settings.bindings().current_model("ai-chat").as_deref(), Some("m1"));
    }

    #[test]
    fn test_reset_all() {
        let settings = settings();

        settings.credentials().set_secret("google", "secret").unwrap();
        settings.bindings().set_model("ai-chat", "m2").unwrap();
        settings
            .bindings()
            .set_workflow_parameter("review-workflow-id", "wf-1")
            .unwrap();

        settings.reset_all().unwrap();

        assert_eq!(settings.credentials().get_secret("google"), "");
        assert_eq!(settings.bindings().current_model("ai-chat").as_deref(), Some("m1"));
        assert_eq!(
            settings.bindings().get_workflow_parameter("review-workflow-id"),
            "wf-1"
        );

        let status = settings.status();
        assert!(!status.providers["google"].configured);
        assert_eq!(status.tools["ai-chat"].current_model, "m1");
    }
}
