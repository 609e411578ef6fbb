//! Child-process execution with captured output and a wall-clock deadline.
//! （執行子行程、擷取輸出並套用實際時鐘逾時限制。）
//!
//! The executor wraps `std::process::Command` to deliver the higher-level API
//! the JavaPad "Run" feature needs: a serialisable command description, a
//! bounded wait, and a hard kill when the deadline passes. Killing on timeout
//! is the default so a runaway `java` process never outlives the report shown
//! to the user.
//! 本模組封裝 `std::process::Command`，提供 JavaPad「執行」功能所需的高階 API：
//! 可序列化的指令描述、有限時間的等待，以及逾時後的強制終止。逾時即終止為預設
//! 行為，失控的 `java` 行程不會在回報結果後仍繼續存活。

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that may surface while spawning or supervising a command.
/// （啟動或監控指令時可能發生的錯誤。）
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn process: {0}")]
    Spawn(std::io::Error),
    #[error("failed to read process output: {0}")]
    Output(std::io::Error),
    #[error("failed to poll process status: {0}")]
    Poll(std::io::Error),
    #[error("process timed out after {0:?}")]
    TimedOut(Duration),
    #[error("failed to terminate process: {0}")]
    Kill(std::io::Error),
}

/// Serializable command description.
/// （可序列化的指令描述資料結構。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default = "default_kill_on_timeout")]
    pub kill_on_timeout: bool,
}

fn default_kill_on_timeout() -> bool {
    true
}

impl CommandSpec {
    /// Creates a new command pointing at the given program.
    /// （以指定的程式建立指令描述。）
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            timeout_ms: None,
            kill_on_timeout: true,
        }
    }

    /// Appends an argument to the command.
    /// （為指令加入一個參數。）
    pub fn push_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments at once.
    /// （一次加入多個參數。）
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Registers an environment variable override.
    /// （設定環境變數覆寫值。）
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    /// （設定指令執行的工作目錄。）
    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    /// Applies a wall-clock deadline to the command execution.
    /// （設定指令執行的實際時鐘逾時限制。）
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_millis().clamp(1, u128::from(u64::MAX)) as u64;
        self.timeout_ms = Some(millis);
        self
    }

    /// Controls whether the process is killed once the deadline passes.
    /// （決定逾時後是否強制終止行程。）
    pub fn with_kill_on_timeout(mut self, kill: bool) -> Self {
        self.kill_on_timeout = kill;
        self
    }
}

/// Result information produced by a supervised command.
/// （受監控指令執行完成後的結果資訊。）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration_ms: u128,
    pub timed_out: bool,
}

impl CommandOutcome {
    /// Indicates whether the command exited successfully (code `0`).
    /// （判斷指令是否以 0 代表成功結束。）
    pub fn success(&self) -> bool {
        !self.timed_out && matches!(self.exit_code, Some(0))
    }

    /// Captured stdout as text, replacing invalid UTF-8 sequences.
    /// （以文字形式取得標準輸出，無效的 UTF-8 序列會被替換。）
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Captured stderr as text, replacing invalid UTF-8 sequences.
    /// （以文字形式取得標準錯誤輸出，無效的 UTF-8 序列會被替換。）
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Runs the described command and captures its output.
/// （執行描述的指令並擷取輸出。）
pub fn execute(spec: &CommandSpec) -> Result<CommandOutcome, ExecError> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.stdin(Stdio::null());

    for (key, value) in &spec.env {
        command.env(key, value);
    }

    if let Some(dir) = &spec.working_dir {
        command.current_dir(dir);
    }

    log::debug!(
        "spawning {} with {} arg(s)",
        spec.program.display(),
        spec.args.len()
    );

    let start = Instant::now();
    let mut child = command.spawn().map_err(ExecError::Spawn)?;

    let timeout_duration = spec.timeout_ms.map(Duration::from_millis);
    let mut timed_out = false;
    let output = match timeout_duration {
        Some(timeout) => loop {
            if child.try_wait().map_err(ExecError::Poll)?.is_some() {
                break child.wait_with_output().map_err(ExecError::Output)?;
            }
            if start.elapsed() >= timeout {
                if spec.kill_on_timeout {
                    log::warn!(
                        "{} exceeded {:?}, killing child",
                        spec.program.display(),
                        timeout
                    );
                    child.kill().map_err(ExecError::Kill)?;
                    timed_out = true;
                    break child.wait_with_output().map_err(ExecError::Output)?;
                } else {
                    return Err(ExecError::TimedOut(timeout));
                }
            }
            thread::sleep(Duration::from_millis(15));
        },
        None => child.wait_with_output().map_err(ExecError::Output)?,
    };
    let duration = start.elapsed();

    Ok(CommandOutcome {
        exit_code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
        duration_ms: duration.as_millis(),
        timed_out,
    })
}
