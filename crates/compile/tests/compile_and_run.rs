use std::time::Duration;

use javapad_compile::{compile_and_run, RunRequest, RunStatus, Toolchain};

/// Integration tests need a real JDK; skip quietly when none is installed so
/// the suite stays green on machines without one.
fn toolchain() -> Option<Toolchain> {
    match Toolchain::locate() {
        Ok(toolchain) => Some(toolchain),
        Err(err) => {
            eprintln!("skipping JDK integration test: {err}");
            None
        }
    }
}

const HELLO_SOURCE: &str = r#"public class Hello {
    public static void main(String[] args) {
        System.out.println("hi");
    }
}
"#;

#[test]
fn hello_world_prints_and_cleans_up() {
    let Some(toolchain) = toolchain() else { return };

    let request = RunRequest::new(HELLO_SOURCE).with_timeout(Duration::from_secs(30));
    let report = compile_and_run(&toolchain, &request).expect("cycle should complete");

    assert!(report.succeeded(), "unexpected report: {report:?}");
    assert_eq!(report.class_name, "Hello");
    assert!(report.output.contains("hi"));
    assert!(
        !report.stage_dir.exists(),
        "stage directory {} should be removed",
        report.stage_dir.display()
    );
}

#[test]
fn syntax_error_reports_diagnostics_without_running() {
    let Some(toolchain) = toolchain() else { return };

    let source = "public class Broken {\n    public static void main(String[] args) {\n        System.out.println(\"hi\")\n    }\n}\n";
    let request = RunRequest::new(source).with_timeout(Duration::from_secs(30));
    let report = compile_and_run(&toolchain, &request).expect("cycle should complete");

    assert_eq!(report.status, RunStatus::CompileFailed);
    assert!(
        !report.output.is_empty(),
        "diagnostics should not be empty"
    );
    assert!(report.output.contains("error"));
    assert!(!report.stage_dir.exists());
}

#[test]
fn infinite_loop_times_out_and_cleans_up() {
    let Some(toolchain) = toolchain() else { return };

    let source = r#"public class Spin {
    public static void main(String[] args) {
        while (true) { }
    }
}
"#;
    let request = RunRequest::new(source).with_timeout(Duration::from_secs(8));
    let report = compile_and_run(&toolchain, &request).expect("cycle should complete");

    assert_eq!(report.status, RunStatus::TimedOut);
    assert!(
        report.duration_ms >= 7_000,
        "budget should be exhausted, took {}ms",
        report.duration_ms
    );
    assert!(
        !report.stage_dir.exists(),
        "stage directory should be removed even on timeout"
    );
}

#[test]
fn argument_string_splits_into_separate_arguments() {
    let Some(toolchain) = toolchain() else { return };

    let source = r#"public class Echo {
    public static void main(String[] args) {
        System.out.println(args.length);
        for (String arg : args) {
            System.out.println(arg);
        }
    }
}
"#;
    let request = RunRequest::new(source)
        .with_args("a b c")
        .with_timeout(Duration::from_secs(30));
    let report = compile_and_run(&toolchain, &request).expect("cycle should complete");

    assert!(report.succeeded(), "unexpected report: {report:?}");
    let lines: Vec<&str> = report.output.lines().collect();
    assert_eq!(lines, vec!["3", "a", "b", "c"]);
}

#[test]
fn missing_public_class_uses_placeholder_name() {
    let Some(toolchain) = toolchain() else { return };

    // No `public class`, so the source is staged as TempClass.java; javac
    // accepts a default-visibility class whose name differs from the file.
    let source = r#"class Quiet {
    public static void main(String[] args) {
        System.out.println("quiet");
    }
}
"#;
    let request = RunRequest::new(source).with_timeout(Duration::from_secs(30));
    let report = compile_and_run(&toolchain, &request).expect("cycle should complete");

    assert_eq!(report.class_name, "TempClass");
    // Compilation succeeds; launching TempClass then fails because the class
    // file is Quiet.class. The placeholder only names the staged file, which
    // mirrors the original tool.
    assert!(matches!(report.status, RunStatus::CompiledAndRan { .. }));
    assert!(!report.succeeded());
}

#[test]
fn nonzero_exit_is_reported_but_not_success() {
    let Some(toolchain) = toolchain() else { return };

    let source = r#"public class Fails {
    public static void main(String[] args) {
        System.err.println("boom");
        System.exit(2);
    }
}
"#;
    let request = RunRequest::new(source).with_timeout(Duration::from_secs(30));
    let report = compile_and_run(&toolchain, &request).expect("cycle should complete");

    assert_eq!(
        report.status,
        RunStatus::CompiledAndRan { exit_code: Some(2) }
    );
    assert!(!report.succeeded());
    assert!(report.output.contains("boom"));
}
