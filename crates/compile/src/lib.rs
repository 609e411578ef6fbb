//! The compile-and-run sequence behind the JavaPad "Run" button.
//! （JavaPad「執行」按鈕背後的編譯執行流程。）
//!
//! One cycle stages the source in a unique temp directory, compiles it with
//! `javac`, runs the resulting class with `java` under the remaining time
//! budget, and removes the directory again whatever the outcome. Compiler
//! diagnostics short-circuit execution: a failed compile never spawns the
//! program.

mod class_name;
mod report;
mod stage;
mod toolchain;

pub use class_name::{extract_public_class, main_class_name, split_args, DEFAULT_CLASS_NAME};
pub use report::{RunReport, RunRequest, RunStatus, DEFAULT_TIMEOUT};
pub use stage::StageDir;
pub use toolchain::Toolchain;

use std::time::{Duration, Instant};

use javapad_runexec::{execute, CommandOutcome, CommandSpec, ExecError};
use thiserror::Error;

/// Errors that abort a cycle before it can produce a [`RunReport`].
/// （在產生 [`RunReport`] 前即中止流程的錯誤。）
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("no Java toolchain found ({0}); install a JDK or set JAVA_HOME")]
    JdkNotFound(String),
    #[error("I/O error while staging source: {0}")]
    Stage(#[from] std::io::Error),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Runs one compile-and-run cycle.
///
/// The request's budget bounds the whole cycle: `javac` gets the full budget
/// and the program gets whatever is left. Either child is killed when its
/// deadline passes, which is what lets the stage directory be removed on the
/// timeout path as well.
pub fn compile_and_run(
    toolchain: &Toolchain,
    request: &RunRequest,
) -> Result<RunReport, CompileError> {
    let started = Instant::now();
    let budget = request.timeout();
    let class_name = main_class_name(&request.source);
    log::info!("compiling {class_name} with a {budget:?} budget");

    let stage = StageDir::create()?;
    let stage_path = stage.path().to_path_buf();
    let source_path = stage.write_source(&class_name, &request.source)?;

    let compile_spec = CommandSpec::new(toolchain.javac())
        .push_arg("-d")
        .push_arg(stage_path.to_string_lossy())
        .push_arg(source_path.to_string_lossy())
        .with_timeout(budget);
    let compiled = execute(&compile_spec)?;

    if compiled.timed_out {
        log::warn!("javac timed out for {class_name}");
        stage.cleanup();
        return Ok(RunReport {
            status: RunStatus::TimedOut,
            class_name,
            output: merged_output(&compiled),
            stage_dir: stage_path,
            duration_ms: elapsed_ms(started),
        });
    }

    if !compiled.success() {
        stage.cleanup();
        return Ok(RunReport {
            status: RunStatus::CompileFailed,
            class_name,
            output: merged_output(&compiled),
            stage_dir: stage_path,
            duration_ms: elapsed_ms(started),
        });
    }

    let remaining = budget
        .saturating_sub(started.elapsed())
        .max(Duration::from_millis(1));
    let run_spec = CommandSpec::new(toolchain.java())
        .push_arg("-cp")
        .push_arg(stage_path.to_string_lossy())
        .push_arg(&class_name)
        .with_args(split_args(&request.args))
        .with_timeout(remaining);
    let ran = execute(&run_spec)?;

    let status = if ran.timed_out {
        RunStatus::TimedOut
    } else {
        RunStatus::CompiledAndRan {
            exit_code: ran.exit_code,
        }
    };
    stage.cleanup();

    Ok(RunReport {
        status,
        class_name,
        output: merged_output(&ran),
        stage_dir: stage_path,
        duration_ms: elapsed_ms(started),
    })
}

/// Stdout followed by stderr, so diagnostics and program output land in one
/// pane the way the original tool merged the streams.
fn merged_output(outcome: &CommandOutcome) -> String {
    let stdout = outcome.stdout_lossy();
    let stderr = outcome.stderr_lossy();
    if stderr.is_empty() {
        return stdout.into_owned();
    }
    if stdout.is_empty() {
        return stderr.into_owned();
    }
    let mut merged = stdout.into_owned();
    if !merged.ends_with('\n') {
        merged.push('\n');
    }
    merged.push_str(&stderr);
    merged
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
