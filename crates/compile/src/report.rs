use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Wall-clock budget for one compile-and-run cycle.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

/// One unit of work for the runner: source text, the raw argument string and
/// the time budget covering both compilation and execution.
/// （執行器的一個工作單位：原始碼、未解析的參數字串，以及涵蓋編譯與執行的
/// 時間預算。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub source: String,
    #[serde(default)]
    pub args: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RunRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            args: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Sets the whitespace-separated argument string passed to the program.
    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().clamp(1, u128::from(u64::MAX)) as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How a compile-and-run cycle ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// `javac` succeeded and the program ran to completion.
    CompiledAndRan { exit_code: Option<i32> },
    /// `javac` reported diagnostics; no program was started.
    CompileFailed,
    /// The time budget ran out during compilation or execution; the child
    /// process was killed.
    TimedOut,
}

/// Result of one compile-and-run cycle, ready for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub class_name: String,
    /// Captured output: compiler diagnostics for a failed compile, otherwise
    /// the program's stdout followed by its stderr.
    pub output: String,
    /// Stage directory the cycle ran in; removed by the time the report is
    /// returned.
    pub stage_dir: PathBuf,
    pub duration_ms: u64,
}

impl RunReport {
    /// True when the program compiled, ran and exited with code `0`.
    pub fn succeeded(&self) -> bool {
        matches!(
            self.status,
            RunStatus::CompiledAndRan { exit_code: Some(0) }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_ten_second_budget() {
        let request = RunRequest::new("class A {}");
        assert_eq!(request.timeout(), DEFAULT_TIMEOUT);
        assert!(request.args.is_empty());
    }

    #[test]
    fn request_roundtrips_through_json() {
        let request = RunRequest::new("class A {}")
            .with_args("a b c")
            .with_timeout(Duration::from_secs(3));
        let json = serde_json::to_string(&request).unwrap();
        let back: RunRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn succeeded_requires_zero_exit() {
        let mut report = RunReport {
            status: RunStatus::CompiledAndRan { exit_code: Some(0) },
            class_name: "A".into(),
            output: String::new(),
            stage_dir: PathBuf::new(),
            duration_ms: 1,
        };
        assert!(report.succeeded());
        report.status = RunStatus::CompiledAndRan { exit_code: Some(1) };
        assert!(!report.succeeded());
        report.status = RunStatus::TimedOut;
        assert!(!report.succeeded());
    }
}
