//! Batch-job polling: an explicit state machine over a polling closure.
//!
//! The batch-capable backend answers a submit request with a job id, then
//! the job must be polled until a terminal status. This module owns the
//! loop shape (bounded attempts, fixed sleep between polls) while the HTTP
//! round trip stays with the caller.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Status of a remote batch extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Parse a server-supplied status, treating anything unrecognized as
    /// still pending so the poll loop keeps going until its budget runs out.
    pub fn parse_lenient(s: &str) -> JobStatus {
        s.parse().unwrap_or_else(|_| {
            tracing::debug!(status = %s, "Unrecognized job status, continuing to poll");
            JobStatus::Pending
        })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Unknown job status: {s}")),
        }
    }
}

/// What one poll round observed.
#[derive(Debug)]
pub enum JobUpdate<T> {
    Pending,
    Completed(T),
    Failed(String),
}

/// Terminal result of a polling run.
#[derive(Debug)]
pub enum PollOutcome<T> {
    Completed(T),
    Failed(String),
    /// The poll budget ran out, or polling itself became impossible,
    /// without the job reaching a terminal status.
    Exhausted,
}

/// Polling schedule for one batch job.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub max_polls: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_polls: 30,
            interval: Duration::from_secs(2),
        }
    }
}

impl PollConfig {
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Drives a polling closure until a terminal state or budget exhaustion.
#[derive(Debug, Clone, Default)]
pub struct JobPoller {
    config: PollConfig,
}

impl JobPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Poll until `Completed`, `Failed`, or the attempt budget is spent.
    ///
    /// A transport error from the closure ends the run as `Exhausted`: the
    /// job may still finish server-side, but its outcome is unreachable and
    /// the caller's fallback path takes over.
    pub async fn run<T, F, Fut>(&self, mut poll: F) -> PollOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<JobUpdate<T>, AppError>>,
    {
        let max_polls = self.config.max_polls.max(1);

        for attempt in 1..=max_polls {
            match poll().await {
                Ok(JobUpdate::Completed(results)) => return PollOutcome::Completed(results),
                Ok(JobUpdate::Failed(error)) => {
                    tracing::error!(%error, "Batch job failed");
                    return PollOutcome::Failed(error);
                }
                Ok(JobUpdate::Pending) => {
                    if attempt < max_polls {
                        tokio::time::sleep(self.config.interval).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Polling failed, abandoning job");
                    return PollOutcome::Exhausted;
                }
            }
        }

        tracing::warn!(max_polls, "Poll budget spent without a terminal status");
        PollOutcome::Exhausted
    }
}
