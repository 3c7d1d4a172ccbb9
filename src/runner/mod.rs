//! Test runners consulted by BUILD before an artifact is accepted.

use crate::skills::{loader::skill_files, parse_skill_file};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Result of one test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub passed: bool,
    pub summary: String,
}

impl TestOutcome {
    pub fn passed(summary: impl Into<String>) -> Self {
        Self {
            passed: true,
            summary: summary.into(),
        }
    }

    pub fn failed(summary: impl Into<String>) -> Self {
        Self {
            passed: false,
            summary: summary.into(),
        }
    }
}

#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Never fails: problems running the tests are reported as a failed outcome.
    async fn run_tests(&self) -> TestOutcome;
}

/// Runs an external command; exit status 0 means the tests passed.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    argv: Vec<String>,
    workdir: Option<PathBuf>,
}

impl CommandTestRunner {
    pub fn new(argv: Vec<String>, workdir: Option<PathBuf>) -> Self {
        Self { argv, workdir }
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    async fn run_tests(&self) -> TestOutcome {
        let Some((program, args)) = self.argv.split_first() else {
            return TestOutcome::failed("no test command configured");
        };

        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        debug!("Running tests: {:?}", self.argv);
        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to start test command {}: {}", program, e);
                return TestOutcome::failed(format!("failed to start {program}: {e}"));
            }
        };

        let tail = last_line(&output.stdout)
            .or_else(|| last_line(&output.stderr))
            .unwrap_or_default();
        if output.status.success() {
            TestOutcome::passed(tail)
        } else {
            TestOutcome::failed(format!("{}: {}", output.status, tail))
        }
    }
}

fn last_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
}

/// Re-parses every artifact; any unparseable one fails the run.
#[derive(Debug, Clone)]
pub struct ArtifactCheckRunner {
    artifacts_dir: PathBuf,
}

impl ArtifactCheckRunner {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }
}

#[async_trait]
impl TestRunner for ArtifactCheckRunner {
    async fn run_tests(&self) -> TestOutcome {
        let files = match skill_files(&self.artifacts_dir) {
            Ok(files) => files,
            Err(e) => return TestOutcome::failed(format!("cannot list artifacts: {e}")),
        };

        let broken: Vec<String> = files
            .iter()
            .filter_map(|path| {
                parse_skill_file(path)
                    .err()
                    .map(|e| format!("{}: {e}", path.display()))
            })
            .collect();

        if broken.is_empty() {
            TestOutcome::passed(format!("{} artifacts parsed", files.len()))
        } else {
            TestOutcome::failed(format!(
                "{} of {} artifacts broken: {}",
                broken.len(),
                files.len(),
                broken.join("; ")
            ))
        }
    }
}

/// Returns a canned outcome, optionally after a delay.
#[derive(Debug, Clone)]
pub struct FixedTestRunner {
    outcome: TestOutcome,
    delay: Option<Duration>,
}

impl FixedTestRunner {
    pub fn passing() -> Self {
        Self {
            outcome: TestOutcome::passed("ok"),
            delay: None,
        }
    }

    pub fn failing(summary: &str) -> Self {
        Self {
            outcome: TestOutcome::failed(summary),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl TestRunner for FixedTestRunner {
    async fn run_tests(&self) -> TestOutcome {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}
