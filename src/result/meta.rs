use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// State of a task as reported by the workers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Received,
    Started,
    Success,
    Failure,
    Retry,
    Revoked,
    /// Any custom state a worker may report.
    Other(String),
}

impl TaskStatus {
    /// Whether the task has stopped changing. Everything but PENDING, RECEIVED, and STARTED is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Received | TaskStatus::Started)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Received => "RECEIVED",
            TaskStatus::Started => "STARTED",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
            TaskStatus::Retry => "RETRY",
            TaskStatus::Revoked => "REVOKED",
            TaskStatus::Other(other) => other,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => TaskStatus::Pending,
            "RECEIVED" => TaskStatus::Received,
            "STARTED" => TaskStatus::Started,
            "SUCCESS" => TaskStatus::Success,
            "FAILURE" => TaskStatus::Failure,
            "RETRY" => TaskStatus::Retry,
            "REVOKED" => TaskStatus::Revoked,
            _ => TaskStatus::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.as_str().to_owned()
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A result record as read from the store. Workers may write it before the task is done, or without a status at all.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTaskMeta {
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    traceback: Value,
}

impl RawTaskMeta {
    /// The record, if it describes a finished task.
    pub(crate) fn into_terminal(self) -> Option<TaskMeta> {
        match self.status {
            Some(status) if status.is_terminal() => Some(TaskMeta {
                status,
                result: self.result,
                traceback: self.traceback,
            }),
            _ => None,
        }
    }
}

/// The outcome of a finished task. Never changes once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskMeta {
    pub status: TaskStatus,
    pub result: Value,
    pub traceback: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_in_flight_states_are_not_terminal() {
        for status in ["PENDING", "RECEIVED", "STARTED"] {
            assert!(!TaskStatus::from(status.to_owned()).is_terminal(), "{status}");
        }
        for status in ["SUCCESS", "FAILURE", "RETRY", "REVOKED", "CUSTOM"] {
            assert!(TaskStatus::from(status.to_owned()).is_terminal(), "{status}");
        }
    }

    #[test]
    fn unknown_status_round_trips() -> Result<(), anyhow::Error> {
        let status: TaskStatus = serde_json::from_value(json!("PROGRESS"))?;
        assert_eq!(status, TaskStatus::Other("PROGRESS".to_owned()));
        assert_eq!(serde_json::to_value(&status)?, json!("PROGRESS"));
        Ok(())
    }

    #[test]
    fn record_without_status_is_not_terminal() -> Result<(), anyhow::Error> {
        let raw: RawTaskMeta = serde_json::from_value(json!({"result": 1}))?;
        assert!(raw.into_terminal().is_none());
        Ok(())
    }

    #[test]
    fn failed_record_keeps_traceback() -> Result<(), anyhow::Error> {
        let raw: RawTaskMeta = serde_json::from_value(json!({
            "status": "FAILURE",
            "result": {"exc_type": "ValueError"},
            "traceback": "Traceback (most recent call last): ...",
        }))?;
        let meta = raw.into_terminal().ok_or_else(|| anyhow::anyhow!("expected terminal record"))?;
        assert_eq!(meta.status, TaskStatus::Failure);
        assert_eq!(meta.traceback, json!("Traceback (most recent call last): ..."));
        Ok(())
    }
}
