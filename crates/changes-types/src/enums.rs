//! Enumeration types shared across the Changes client.
//!
//! [`Status`] and [`ResultKind`] mirror the API's status/result fields on
//! builds, jobs, and test groups. [`Condition`] is the single derived
//! shape the dashboard renders for all three, collapsing the
//! status/result pair into one displayable state.

use serde::{Deserialize, Serialize};

/// Execution status of a runnable resource (build, job, or test group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The server has not reported a recognizable status.
    #[default]
    #[serde(other)]
    Unknown,
    /// Accepted but not yet started.
    Queued,
    /// Currently executing.
    InProgress,
    /// Execution has completed (see [`ResultKind`] for the outcome).
    Finished,
}

/// Outcome of a finished runnable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// No outcome yet, or the server sent an unrecognized value.
    #[default]
    #[serde(other)]
    Unknown,
    /// All steps succeeded.
    Passed,
    /// At least one step failed.
    Failed,
    /// Execution was aborted before completion.
    Aborted,
    /// Execution was skipped.
    Skipped,
    /// Failure attributed to infrastructure rather than the change.
    InfraFailed,
}

/// The single displayable condition derived from status and result.
///
/// Every runnable resource renders through this shape, so the
/// derivation must be total over ([`Status`], [`ResultKind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Queued or still executing.
    Waiting,
    /// Finished and passed (or skipped).
    Passed,
    /// Finished and failed or aborted.
    Failed,
    /// Finished with an infrastructure failure.
    FailedInfra,
    /// Status or result could not be interpreted.
    Unknown,
}

impl Condition {
    /// Derive the displayable condition from a status/result pair.
    pub const fn of(status: Status, result: ResultKind) -> Self {
        match status {
            Status::Queued | Status::InProgress => Self::Waiting,
            Status::Finished => match result {
                ResultKind::Passed | ResultKind::Skipped => Self::Passed,
                ResultKind::Failed | ResultKind::Aborted => Self::Failed,
                ResultKind::InfraFailed => Self::FailedInfra,
                ResultKind::Unknown => Self::Unknown,
            },
            Status::Unknown => Self::Unknown,
        }
    }

    /// Whether the resource has reached a terminal condition.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Waiting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_while_queued_or_running() {
        assert_eq!(
            Condition::of(Status::Queued, ResultKind::Unknown),
            Condition::Waiting
        );
        assert_eq!(
            Condition::of(Status::InProgress, ResultKind::Unknown),
            Condition::Waiting
        );
        // Result is ignored until the resource finishes.
        assert_eq!(
            Condition::of(Status::InProgress, ResultKind::Failed),
            Condition::Waiting
        );
    }

    #[test]
    fn finished_maps_result_to_condition() {
        assert_eq!(
            Condition::of(Status::Finished, ResultKind::Passed),
            Condition::Passed
        );
        assert_eq!(
            Condition::of(Status::Finished, ResultKind::Skipped),
            Condition::Passed
        );
        assert_eq!(
            Condition::of(Status::Finished, ResultKind::Failed),
            Condition::Failed
        );
        assert_eq!(
            Condition::of(Status::Finished, ResultKind::Aborted),
            Condition::Failed
        );
        assert_eq!(
            Condition::of(Status::Finished, ResultKind::InfraFailed),
            Condition::FailedInfra
        );
        assert_eq!(
            Condition::of(Status::Finished, ResultKind::Unknown),
            Condition::Unknown
        );
    }

    #[test]
    fn derivation_is_total() {
        let statuses = [
            Status::Unknown,
            Status::Queued,
            Status::InProgress,
            Status::Finished,
        ];
        let results = [
            ResultKind::Unknown,
            ResultKind::Passed,
            ResultKind::Failed,
            ResultKind::Aborted,
            ResultKind::Skipped,
            ResultKind::InfraFailed,
        ];
        for status in statuses {
            for result in results {
                // Must not panic and must classify terminality consistently.
                let condition = Condition::of(status, result);
                if status == Status::Queued || status == Status::InProgress {
                    assert!(!condition.is_terminal());
                }
            }
        }
    }

    #[test]
    fn unknown_wire_values_fall_back() {
        let status: Status = serde_json::from_str("\"exploded\"").unwrap_or_default();
        assert_eq!(status, Status::Unknown);
        let result: ResultKind = serde_json::from_str("\"exploded\"").unwrap_or_default();
        assert_eq!(result, ResultKind::Unknown);
    }

    #[test]
    fn wire_names_are_snake_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap_or_default();
        assert_eq!(json, "\"in_progress\"");
        let json = serde_json::to_string(&ResultKind::InfraFailed).unwrap_or_default();
        assert_eq!(json, "\"infra_failed\"");
    }
}
