use serde::{Deserialize, Serialize};

pub(super) const DEFAULT_API_BASE: &str = "https://api.coze.cn/v1";

/// Where a local deployment is reached when no endpoint is configured.
pub const LOCAL_DEFAULT_ENDPOINT: &str = "http://localhost:8080";

pub(super) const HOSTED_PATH: &str = "workflow/stream_run";
pub(super) const LOCAL_PATH: &str = "api/v1/workflow/stream_run";

/// The workflow input which carries the conversation.
pub(super) const MESSAGE_PARAMETER: &str = "message";

/* Structures to serialize /workflow/stream_run */

#[derive(Serialize, Debug)]
pub(super) struct WorkflowRunRequest<'w> {
    pub workflow_id: &'w str,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/* API Errors */

#[derive(Deserialize, Debug)]
pub(super) struct ApiErrorPayload {
    pub msg: String,
}
