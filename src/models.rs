//! Boundary types exchanged with the search service.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// Handle for an asynchronous operation the service accepted.
///
/// Without an index name the handle refers to an application-level task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: i64,
    pub index_name: Option<String>,
    pub submitted_at: Instant,
}

impl TaskHandle {
    pub fn new(task_id: i64, index_name: impl Into<String>) -> Self {
        Self {
            task_id,
            index_name: Some(index_name.into()),
            submitted_at: Instant::now(),
        }
    }

    pub fn application(task_id: i64) -> Self {
        Self {
            task_id,
            index_name: None,
            submitted_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Published,
    NotPublished,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Published)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTaskResponse {
    pub status: TaskStatus,
}

/// Write action applied to every record of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchAction {
    AddObject,
    UpdateObject,
    PartialUpdateObject,
    PartialUpdateObjectNoCreate,
    DeleteObject,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest<'a, T: Serialize> {
    pub action: BatchAction,
    pub body: &'a T,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchWriteParams<'a, T: Serialize> {
    pub requests: Vec<BatchRequest<'a, T>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    #[serde(rename = "taskID")]
    pub task_id: i64,
    #[serde(rename = "objectIDs", default)]
    pub object_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Copy,
    Move,
}

/// Parts of an index copied by a scoped copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Settings,
    Rules,
    Synonyms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationIndexParams {
    pub operation: OperationType,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<ScopeType>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedAtResponse {
    #[serde(rename = "taskID")]
    pub task_id: i64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// API key settings compared field by field when waiting for an update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub acl: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub indexes: Vec<String>,
    #[serde(default)]
    pub max_hits_per_query: Option<u32>,
    #[serde(default)]
    pub max_queries_per_ip_per_hour: Option<u32>,
    #[serde(default)]
    pub query_parameters: Option<String>,
    #[serde(default)]
    pub referers: Vec<String>,
    #[serde(default)]
    pub validity: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetApiKeyResponse {
    pub value: String,
    #[serde(default)]
    pub created_at: Option<u64>,
    #[serde(flatten)]
    pub key: ApiKey,
}

/// Provisioning operation a key wait observes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyOperation {
    Add,
    Update,
    Delete,
}

/// Cursor-paginated browse of an index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    pub hits: Vec<Value>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub nb_hits: Option<u64>,
}

/// Page-number search used to browse rules and synonyms
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPageParams {
    pub query: String,
    pub page: u32,
    pub hits_per_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPageResponse {
    pub hits: Vec<Value>,
    #[serde(default)]
    pub nb_hits: u64,
}
