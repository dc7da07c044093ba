//! Judge client implementation
//!
//! The judge is an external sandbox service: given code, a language and test
//! cases it returns per-test pass/fail and runtimes. The engine never executes
//! submitted code itself. A call that exceeds its overall deadline is answered
//! with a synthetic all-failed verdict tagged `timed_out` instead of blocking
//! the contest; there is no automatic retry, participants may simply resubmit.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::TestCase;

/// One judged test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: bool,
    pub actual: String,
    pub expected: String,
    pub runtime_ms: u64,
    pub hidden: bool,
}

/// Outcome of a single judge call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub results: Vec<TestResult>,
    #[serde(default)]
    pub compile_error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
}

impl JudgeVerdict {
    pub fn passed_count(&self) -> u32 {
        self.results.iter().filter(|r| r.passed).count() as u32
    }

    pub fn total_count(&self) -> u32 {
        self.results.len() as u32
    }

    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.passed)
    }

    /// Synthetic all-failed verdict for a timed-out or failed judge call
    pub fn synthetic_failure(test_cases: &[TestCase], timed_out: bool) -> Self {
        Self {
            results: test_cases
                .iter()
                .map(|t| TestResult {
                    passed: false,
                    actual: String::new(),
                    expected: t.expected_output.clone(),
                    runtime_ms: 0,
                    hidden: t.hidden,
                })
                .collect(),
            compile_error: None,
            timed_out,
        }
    }
}

/// A judge request: code plus the test cases to run it against
#[derive(Debug, Clone, Serialize)]
pub struct JudgeRequest {
    pub code: String,
    pub language: String,
    pub test_cases: Vec<TestCase>,
    pub per_test_timeout_ms: u64,
}

/// Async interface to the execution sandbox
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Judge the given code against the supplied test cases.
    ///
    /// Implementations must respect the caller's overall deadline; errors are
    /// surfaced to the caller, which converts them into a failed submission.
    async fn judge(&self, request: &JudgeRequest) -> AppResult<JudgeVerdict>;
}

/// HTTP adapter to the sandbox service
pub struct HttpJudgeClient {
    client: reqwest::Client,
    base_url: String,
    deadline: Duration,
}

impl HttpJudgeClient {
    pub fn new(base_url: String, deadline_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            deadline: Duration::from_millis(deadline_ms),
        }
    }
}

#[async_trait]
impl JudgeClient for HttpJudgeClient {
    async fn judge(&self, request: &JudgeRequest) -> AppResult<JudgeVerdict> {
        let url = format!("{}/judge", self.base_url.trim_end_matches('/'));

        // One deadline over the whole exchange, body read included; a judge
        // that returns headers and then stalls still times out
        let exchange = async {
            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| AppError::Judge(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AppError::Judge(format!(
                    "judge returned status {}",
                    response.status()
                )));
            }

            response
                .json::<JudgeVerdict>()
                .await
                .map_err(|e| AppError::Judge(e.to_string()))
        };

        tokio::time::timeout(self.deadline, exchange)
            .await
            .map_err(|_| AppError::JudgeTimeout)?
    }
}
