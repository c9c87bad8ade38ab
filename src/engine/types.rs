use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A runnable process definition as reported by the engine's listing API.
///
/// Descriptors are immutable snapshots of a single listing call; the raw
/// response object is preserved in `metadata` for callers that need fields
/// beyond the typed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub metadata: Value,
}

/// Result of instantiating a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartProcessOutcome {
    pub case_id: String,
    pub process_definition_id: String,
    pub metadata: Value,
}

/// A human task as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub state: String,
    pub assigned_id: Option<String>,
    pub metadata: Value,
}

/// A process instance (case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDescriptor {
    pub id: String,
    pub process_definition_id: String,
    pub state: String,
    pub started_by: Option<String>,
    pub metadata: Value,
}

/// A single variable attached to a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseVariable {
    pub name: String,
    pub value: Value,
    pub id: Option<String>,
    pub case_id: Option<String>,
    pub metadata: Value,
}

/// A case together with its variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseWithVariables {
    pub case: CaseDescriptor,
    pub variables: Vec<CaseVariable>,
}

/// Filter options for the human-task listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFilter {
    pub state: Option<String>,
    pub page: u32,
    pub count: u32,
    pub user_id: Option<String>,
    pub process_id: Option<String>,
    pub sort: Option<String>,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            state: Some("ready".to_string()),
            page: 0,
            count: 10,
            user_id: None,
            process_id: None,
            sort: None,
        }
    }
}

/// Classification of a failed engine call.
///
/// HTTP failures carry the upstream status code; transport-level failures
/// where no response was received at all are reported separately so callers
/// never mistake a connectivity problem for an engine verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Http(u16),
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Http(status) => write!(f, "HTTP {status}"),
            FailureKind::Network => write!(f, "network"),
        }
    }
}

/// Errors produced by the engine integration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The engine rejected the login, or the login endpoint was unreachable.
    /// The two causes are distinguished only by the message.
    #[error("authentication with the engine failed: {0}")]
    Authentication(String),
    /// A call failed after the retry policy was exhausted.
    #[error("engine request failed ({status}): {message}")]
    Request { status: FailureKind, message: String },
}

impl ProcessDescriptor {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            id: string_field(raw, &["id"]),
            name: string_field(raw, &["name"]),
            display_name: string_field(raw, &["displayName", "display_name"]),
            version: string_field(raw, &["version"]),
            metadata: raw.clone(),
        }
    }
}

impl StartProcessOutcome {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            case_id: string_field(raw, &["caseId"]),
            process_definition_id: string_field(raw, &["processDefinitionId"]),
            metadata: raw.clone(),
        }
    }
}

impl TaskDescriptor {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            id: string_field(raw, &["id"]),
            name: string_field(raw, &["name"]),
            display_name: string_field(raw, &["displayName", "display_name"]),
            state: string_field(raw, &["state"]),
            assigned_id: optional_string_field(raw, &["assigned_id", "assignedId"]),
            metadata: raw.clone(),
        }
    }
}

impl CaseDescriptor {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            id: string_field(raw, &["id"]),
            process_definition_id: string_field(raw, &["processDefinitionId"]),
            state: string_field(raw, &["state"]),
            started_by: optional_string_field(raw, &["started_by", "startedBy"]),
            metadata: raw.clone(),
        }
    }
}

impl CaseVariable {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            name: string_field(raw, &["name"]),
            value: raw.get("value").cloned().unwrap_or(Value::Null),
            id: optional_string_field(raw, &["id"]),
            case_id: optional_string_field(raw, &["case_id", "caseId"]),
            metadata: raw.clone(),
        }
    }
}

/// Reads the first present key as a string, stringifying numeric ids.
/// Missing fields map to an empty string; the engine omits fields freely.
fn string_field(raw: &Value, keys: &[&str]) -> String {
    optional_string_field(raw, keys).unwrap_or_default()
}

fn optional_string_field(raw: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match raw.get(*key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}
