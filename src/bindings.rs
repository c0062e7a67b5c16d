//! The tool→model binding resolver and the workflow parameter store.
//!
//! A binding is stored under `binding.<tool>` and only ever consulted through the
//! catalog: a stored model which the tool no longer supports resolves to the
//! tool's default. Workflow parameters are independent strings stored under
//! `workflow.<key>`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::store::{
    decode_snapshot, KeyValueStore, KeyValueStoreExt, SnapshotError, StoreError,
};

const BINDING_PREFIX: &str = "binding.";
const WORKFLOW_PREFIX: &str = "workflow.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingValidation {
    pub valid: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub tool_name: String,
    pub current_model: String,
    pub model_name: String,
    pub provider: Option<String>,
}

/// A selectable model, as shown in a picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSnapshot {
    #[serde(default)]
    pub tool_models: BTreeMap<String, String>,
    #[serde(default)]
    pub workflow_ids: BTreeMap<String, String>,
}

pub struct ToolBindings {
    catalog: Arc<Catalog>,
    store: Arc<dyn KeyValueStore>,
}

impl ToolBindings {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn KeyValueStore>) -> ToolBindings {
        ToolBindings { catalog, store }
    }

    /// The model bound to `tool_id`. Always one of the tool's supported models;
    /// `None` only for a tool the catalog does not know.
    pub fn current_model(&self, tool_id: &str) -> Option<String> {
        let default = self.catalog.default_model(tool_id)?;

        match self.store.get(&binding_key(tool_id)) {
            Some(model_id) if self.catalog.is_model_supported(tool_id, &model_id) => Some(model_id),
            Some(stale) => {
                debug!(tool = tool_id, model = %stale, "ignoring unsupported binding");
                Some(default.to_string())
            }
            None => Some(default.to_string()),
        }
    }

    /// The binding as stored, without falling back to the default.
    pub fn stored_model(&self, tool_id: &str) -> Option<String> {
        self.store.get(&binding_key(tool_id))
    }

    /// Bind `model_id` to `tool_id`. Returns `false`, without writing anything,
    /// when the tool does not support the model.
    pub fn set_model(&self, tool_id: &str, model_id: &str) -> Result<bool, StoreError> {
        if !self.catalog.is_model_supported(tool_id, model_id) {
            debug!(tool = tool_id, model = model_id, "rejected unsupported binding");
            return Ok(false);
        }

        self.store.set(&binding_key(tool_id), model_id)?;

        info!(tool = tool_id, model = model_id, "binding updated");

        Ok(true)
    }

    pub fn reset_to_default(&self, tool_id: &str) -> Result<(), StoreError> {
        self.store.remove(&binding_key(tool_id))
    }

    pub fn reset_all(&self) -> Result<(), StoreError> {
        self.store.remove_prefix(BINDING_PREFIX)?;

        info!("all bindings reset");

        Ok(())
    }

    pub fn set_workflow_parameter(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.store.set(&workflow_key(key), value)
    }

    /// The stored workflow parameter, or an empty string.
    pub fn get_workflow_parameter(&self, key: &str) -> String {
        self.store.get(&workflow_key(key)).unwrap_or_default()
    }

    /// The workflow id configured for `tool_id` when it runs on `provider_id`.
    pub fn workflow_for(&self, tool_id: &str, provider_id: &str) -> Option<String> {
        let key = self.catalog.tool(tool_id)?.workflows.get(provider_id)?;

        Some(self.get_workflow_parameter(key)).filter(|id| !id.is_empty())
    }

    pub fn validate(&self, tool_id: &str, model_id: &str) -> BindingValidation {
        let (valid, message) = if self.catalog.model(model_id).is_none() {
            (false, format!("model \"{}\" does not exist", model_id))
        } else if !self.catalog.is_model_supported(tool_id, model_id) {
            (
                false,
                format!("model \"{}\" is not supported by \"{}\"", model_id, tool_id),
            )
        } else {
            (true, "binding is valid".to_string())
        };

        BindingValidation { valid, message }
    }

    pub fn status(&self) -> BTreeMap<String, ToolStatus> {
        self.catalog
            .tools()
            .filter_map(|tool| {
                let current_model = self.current_model(&tool.id)?;
                let model = self.catalog.model(&current_model);

                let status = ToolStatus {
                    tool_name: tool.name.clone(),
                    model_name: model.map_or_else(|| current_model.clone(), |m| m.name.clone()),
                    provider: model.map(|m| m.provider.clone()),
                    current_model,
                };

                Some((tool.id.clone(), status))
            })
            .collect()
    }

    pub fn supported_model_options(&self, tool_id: &str) -> Vec<ModelOption> {
        self.catalog
            .supported_models(tool_id)
            .iter()
            .map(|id| ModelOption {
                id: id.clone(),
                name: self
                    .catalog
                    .model(id)
                    .map_or_else(|| id.clone(), |m| m.name.clone()),
            })
            .collect()
    }

    pub fn export(&self) -> BindingSnapshot {
        let collect = |prefix: &str| {
            self.store
                .keys_with_prefix(prefix)
                .into_iter()
                .filter_map(|k| {
                    let value = self.store.get(&format!("{}{}", prefix, k))?;
                    Some((k, value))
                })
                .collect::<BTreeMap<String, String>>()
        };

        BindingSnapshot {
            tool_models: collect(BINDING_PREFIX),
            workflow_ids: collect(WORKFLOW_PREFIX),
        }
    }

    /// Replace every binding and workflow parameter with the contents of `snapshot`.
    pub fn import(&self, snapshot: &BindingSnapshot) -> Result<(), StoreError> {
        self.store.remove_prefix(BINDING_PREFIX)?;
        self.store.remove_prefix(WORKFLOW_PREFIX)?;

        for (tool_id, model_id) in &snapshot.tool_models {
            self.store.set(&binding_key(tool_id), model_id)?;
        }

        for (key, value) in &snapshot.workflow_ids {
            self.store.set(&workflow_key(key), value)?;
        }

        debug!(
            bindings = snapshot.tool_models.len(),
            workflows = snapshot.workflow_ids.len(),
            "bindings imported"
        );

        Ok(())
    }

    pub fn export_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Parse `document` and import it. Nothing is written unless it parses.
    pub fn import_json(&self, document: &str) -> Result<(), SnapshotError> {
        let snapshot: BindingSnapshot =
            decode_snapshot(document, &["tool_models", "workflow_ids"])?;

        Ok(self.import(&snapshot)?)
    }
}

fn binding_key(tool_id: &str) -> String {
    format!("{}{}", BINDING_PREFIX, tool_id)
}

fn workflow_key(key: &str) -> String {
    format!("{}{}", WORKFLOW_PREFIX, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::test_catalog;
    use crate::store::MemoryStore;

    fn bindings() -> (ToolBindings, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());

        (
            ToolBindings::new(Arc::new(test_catalog()), store.clone()),
            store,
        )
    }

    #[test]
    fn test_unsupported_model_rejected() {
        let (bindings, store) = bindings();

        assert_eq!(bindings.current_model("ai-chat").as_deref(), Some("m1"));
        assert!(!bindings.set_model("ai-chat", "m3").unwrap());
        assert_eq!(bindings.current_model("ai-chat").as_deref(), Some("m1"));
        assert!(store.keys().is_empty());

        assert!(!bindings.set_model("ai-chat", "nope").unwrap());
        assert!(!bindings.set_model("unknown-tool", "m1").unwrap());
    }

    #[test]
    fn test_set_and_reset() {
        let (bindings, _) = bindings();

        assert!(bindings.set_model("ai-chat", "m2").unwrap());
        assert_eq!(bindings.current_model("ai-chat").as_deref(), Some("m2"));

        bindings.reset_to_default("ai-chat").unwrap();
        bindings.reset_to_default("ai-chat").unwrap();
        assert_eq!(bindings.current_model("ai-chat").as_deref(), Some("m1"));

        assert!(bindings.set_model("ai-chat", "m2").unwrap());
        assert!(bindings.set_model("review", "m2").unwrap());
        bindings.set_workflow_parameter("review-workflow-id", "wf-1").unwrap();

        bindings.reset_all().unwrap();

        assert_eq!(bindings.current_model("ai-chat").as_deref(), Some("m1"));
        assert_eq!(bindings.current_model("review").as_deref(), Some("wf"));
        assert_eq!(bindings.get_workflow_parameter("review-workflow-id"), "wf-1");
    }

    #[test]
    fn test_stale_binding_falls_back() {
        let (bindings, store) = bindings();

        for stale in ["m3", "deleted-model", ""] {
            store.set("binding.ai-chat", stale).unwrap();
            assert_eq!(bindings.current_model("ai-chat").as_deref(), Some("m1"));
        }

        assert_eq!(bindings.current_model("unknown-tool"), None);
    }

    #[test]
    fn test_current_model_always_supported() {
        let (bindings, store) = bindings();
        let catalog = test_catalog();

        for model in ["m1", "m2", "m3", "wf", "wf-local", "orphan", "free", "x"] {
            for tool in catalog.tools() {
                store.set(&format!("binding.{}", tool.id), model).unwrap();

                let current = bindings.current_model(&tool.id).unwrap();
                assert!(catalog.is_model_supported(&tool.id, &current));
            }
        }
    }

    #[test]
    fn test_workflow_parameters() {
        let (bindings, _) = bindings();

        assert_eq!(bindings.get_workflow_parameter("review-workflow-id"), "");
        assert_eq!(bindings.workflow_for("review", "coze"), None);

        bindings.set_workflow_parameter("review-workflow-id", "wf-hosted").unwrap();
        bindings
            .set_workflow_parameter("review-local-workflow-id", "wf-local")
            .unwrap();

        assert_eq!(bindings.workflow_for("review", "coze").as_deref(), Some("wf-hosted"));
        assert_eq!(
            bindings.workflow_for("review", "coze-local").as_deref(),
            Some("wf-local")
        );
        assert_eq!(bindings.workflow_for("review", "deepseek"), None);
        assert_eq!(bindings.workflow_for("ai-chat", "coze"), None);

        bindings.set_workflow_parameter("review-workflow-id", "").unwrap();
        assert_eq!(bindings.workflow_for("review", "coze"), None);
    }

    #[test]
    fn test_validate() {
        let (bindings, _) = bindings();

        assert!(bindings.validate("ai-chat", "m2").valid);
        assert!(!bindings.validate("ai-chat", "m3").valid);
        assert!(!bindings.validate("ai-chat", "ghost").valid);
    }

    #[test]
    fn test_status_and_options() {
        let (bindings, _) = bindings();

        bindings.set_model("review", "m2").unwrap();

        let status = bindings.status();

        assert_eq!(
            status["review"],
            ToolStatus {
                tool_name: "Review".to_string(),
                current_model: "m2".to_string(),
                model_name: "Model Two".to_string(),
                provider: Some("deepseek".to_string()),
            }
        );
        assert_eq!(status["ai-chat"].current_model, "m1");

        let options = bindings.supported_model_options("ai-chat");
        assert_eq!(
            options,
            [
                ModelOption {
                    id: "m1".to_string(),
                    name: "Model One".to_string()
                },
                ModelOption {
                    id: "m2".to_string(),
                    name: "Model Two".to_string()
                },
            ]
        );
        assert!(bindings.supported_model_options("unknown-tool").is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (bindings, _) = bindings();

        bindings.set_model("ai-chat", "m2").unwrap();
        bindings.set_workflow_parameter("review-workflow-id", "wf-1").unwrap();

        let exported = bindings.export_json().unwrap();

        let (other, _) = self::bindings();
        other.set_model("review", "m2").unwrap();
        other.import_json(&exported).unwrap();

        assert_eq!(other.export_json().unwrap(), exported);
        assert_eq!(other.current_model("review").as_deref(), Some("wf"));
        assert_eq!(other.current_model("ai-chat").as_deref(), Some("m2"));

        assert!(matches!(
            other.import_json("not json"),
            Err(SnapshotError::Parse(_))
        ));
        assert_eq!(other.current_model("ai-chat").as_deref(), Some("m2"));
    }

    #[test]
    fn test_import_rejects_wrong_shape() {
        let (bindings, _) = bindings();

        bindings.set_model("ai-chat", "m2").unwrap();
        bindings.set_workflow_parameter("review-workflow-id", "wf-1").unwrap();

        assert!(matches!(
            bindings.import_json("[]"),
            Err(SnapshotError::NotAnObject(_))
        ));
        assert!(matches!(
            bindings.import_json(r#"{"tool_models": [["ai-chat", "m1"]]}"#),
            Err(SnapshotError::NotAnObject(_))
        ));
        assert!(matches!(
            bindings.import_json(r#"{"toolModels": {"ai-chat": "m1"}}"#),
            Err(SnapshotError::Parse(_))
        ));

        assert_eq!(bindings.current_model("ai-chat").as_deref(), Some("m2"));
        assert_eq!(bindings.get_workflow_parameter("review-workflow-id"), "wf-1");
    }

    #[test]
    fn test_stored_model() {
        let (bindings, store) = bindings();

        assert_eq!(bindings.stored_model("ai-chat"), None);

        store.set("binding.ai-chat", "m3").unwrap();

        assert_eq!(bindings.stored_model("ai-chat").as_deref(), Some("m3"));
        assert_eq!(bindings.current_model("ai-chat").as_deref(), Some("m1"));
    }
}
