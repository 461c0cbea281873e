use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a pipeline operation.
///
/// Only `Success` and `Failure` are produced today; the other values are
/// kept for asynchronous execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failure,
    InProgress,
    Pending,
    Cancelled,
    TimedOut,
    Skipped,
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Success => "success",
            TaskStatus::Failure => "failure",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Pending => "pending",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::TimedOut => "timed_out",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Unknown => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        *self == TaskStatus::Success
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
