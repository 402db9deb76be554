use chrono::{DateTime, Utc};
use serde::Serialize;

/// Observable lifecycle of a long-running vendor job.
///
/// `Submitted -> Running -> {Succeeded, Failed}`. Some vendors never report
/// `Submitted` separately. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// A job driven to a terminal state. Lives only for the call that ran it.
#[derive(Debug, Clone)]
pub struct AsyncJob<S> {
    pub id: String,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Number of poll calls made, failed ones included.
    pub polls: u32,
    /// Last status the vendor reported.
    pub status: Option<S>,
    /// Vendor diagnostic for a failed job.
    pub error: Option<String>,
}

impl<S> AsyncJob<S> {
    pub fn submitted(id: String) -> Self {
        Self {
            id,
            state: JobState::Submitted,
            submitted_at: Utc::now(),
            finished_at: None,
            polls: 0,
            status: None,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == JobState::Succeeded
    }

    /// Wall-clock time from submission to the terminal state.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.submitted_at)
    }
}
