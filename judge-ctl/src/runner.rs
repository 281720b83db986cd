use std::path::Path;
use std::process::Command;

use judge_checker::{ExpectedOutput, StandardChecker};
use judge_core::util::parse_test_selection;
use judge_core::{JudgeError, Result, Verdict};
use judge_rs::{Submission, VerdictEngine};
use log::{debug, info, warn};

use crate::store::{TestStore, Testset};

/// Verdict of one stored test
#[derive(Debug, Clone)]
pub struct TestResult {
    pub number: u32,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default)]
pub struct TestsetReport {
    pub results: Vec<TestResult>,
}

impl TestsetReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.verdict.is_accepted()).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_accepted(&self) -> bool {
        self.passed() == self.total()
    }
}

/// Compile, run every selected test in order, then clean up.
///
/// `selection` uses the `1-3,5` syntax; every listed test must exist.
/// `on_result` sees each verdict as soon as it is known.
pub fn run_testset(
    store: &TestStore,
    name: &str,
    selection: Option<&str>,
    mut on_result: impl FnMut(&TestResult),
) -> Result<TestsetReport> {
    let testset = store.testset(name)?;
    let available = store.test_numbers(name)?;

    let numbers = match selection {
        Some(s) => {
            let wanted = parse_test_selection(s)?;
            if let Some(&missing) = wanted.iter().find(|n| !available.contains(n)) {
                return Err(JudgeError::TestNotFound {
                    set: name.to_string(),
                    number: missing,
                });
            }
            wanted
        }
        None => available,
    };

    if let Some(compile) = &testset.scripts.compile {
        info!("Compiling {}", name);
        run_script("compile", compile, store.project_dir())?;
    }

    let report = run_tests(store, name, &testset, &numbers, &mut on_result);

    if let Some(cleanup) = &testset.scripts.cleanup {
        if let Err(e) = run_script("cleanup", cleanup, store.project_dir()) {
            warn!("{}", e);
        }
    }

    report
}

fn run_tests(
    store: &TestStore,
    name: &str,
    testset: &Testset,
    numbers: &[u32],
    on_result: &mut impl FnMut(&TestResult),
) -> Result<TestsetReport> {
    let engine = VerdictEngine::default();
    let checker = StandardChecker::new(testset.checker).with_debug_marker(&testset.debug_marker);
    let mut report = TestsetReport::default();

    for &number in numbers {
        let case = store.read_test(name, number)?;
        let expected = ExpectedOutput::new(String::from_utf8_lossy(&case.output));
        let submission =
            Submission::from_command_line(&testset.scripts.run)?.current_dir(store.project_dir());

        debug!("Running {} test {}", name, number);
        let verdict =
            engine.evaluate_with(submission, &case.input, &expected, testset.limits, &checker);

        let result = TestResult { number, verdict };
        on_result(&result);
        report.results.push(result);
    }

    Ok(report)
}

/// Run a shell script in `dir`; a non-zero exit is an error naming `stage`
fn run_script(stage: &str, script: &str, dir: &Path) -> Result<()> {
    debug!("{}: sh -c {:?}", stage, script);
    let output = Command::new("sh")
        .arg("-c")
        .arg(script)
        .current_dir(dir)
        .output()?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut detail = match output.status.code() {
        Some(code) => format!("exited with code {}", code),
        None => "terminated by a signal".to_string(),
    };
    if let Some(line) = stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
        detail.push_str(": ");
        detail.push_str(line);
    }

    Err(JudgeError::Script {
        stage: stage.to_string(),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Scripts;
    use judge_checker::ComparisonPolicy;
    use judge_core::{Limits, VerdictKind};
    use tempfile::TempDir;

    fn store_with(run: &str, compile: Option<&str>, cleanup: Option<&str>) -> (TempDir, TestStore) {
        let dir = TempDir::new().unwrap();
        let (store, _) = TestStore::init(dir.path(), false).unwrap();
        let testset = Testset {
            limits: Limits::new(2000, 64 * 1024 * 1024),
            scripts: Scripts {
                compile: compile.map(str::to_string),
                run: run.to_string(),
                cleanup: cleanup.map(str::to_string),
            },
            checker: ComparisonPolicy::ExactToken,
            debug_marker: "#".to_string(),
        };
        store.add_set("cat", testset).unwrap();
        (dir, store)
    }

    #[test]
    fn reports_each_test_in_order() {
        let (_dir, store) = store_with("/bin/cat", None, None);
        store.add_test("cat", b"1\n", b"1\n").unwrap();
        store.add_test("cat", b"2\n", b"3\n").unwrap();
        store.add_test("cat", b"3\n", b"3\n").unwrap();

        let mut seen = Vec::new();
        let report = run_testset(&store, "cat", None, |r| seen.push(r.number)).unwrap();

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.total(), 3);
        assert!(!report.all_accepted());
        assert_eq!(report.results[1].verdict.kind, VerdictKind::WrongAnswer);
    }

    #[test]
    fn selection_limits_the_run() {
        let (_dir, store) = store_with("/bin/cat", None, None);
        for _ in 0..3 {
            store.add_test("cat", b"x", b"x").unwrap();
        }

        let report = run_testset(&store, "cat", Some("1,3"), |_| {}).unwrap();
        let numbers: Vec<u32> = report.results.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert!(report.all_accepted());
    }

    #[test]
    fn selecting_a_missing_test_fails_before_running() {
        let (dir, store) = store_with("/bin/cat", Some("touch compiled"), None);
        store.add_test("cat", b"x", b"x").unwrap();

        let err = run_testset(&store, "cat", Some("1-2"), |_| {}).unwrap_err();
        assert!(matches!(err, JudgeError::TestNotFound { number: 2, .. }));
        assert!(!dir.path().join("compiled").exists());
    }

    #[test]
    fn scripts_run_in_the_project_directory() {
        let (dir, store) = store_with(
            "cat marker",
            Some("echo built > marker"),
            Some("rm marker; touch cleaned"),
        );
        store.add_test("cat", b"", b"built").unwrap();

        let report = run_testset(&store, "cat", None, |_| {}).unwrap();
        assert!(report.all_accepted(), "{:?}", report.results);
        assert!(!dir.path().join("marker").exists());
        assert!(dir.path().join("cleaned").exists());
    }

    #[test]
    fn compile_failure_stops_the_run() {
        let (_dir, store) = store_with("/bin/cat", Some("echo 'syntax error' >&2; exit 2"), None);
        store.add_test("cat", b"x", b"x").unwrap();

        let mut calls = 0;
        let err = run_testset(&store, "cat", None, |_| calls += 1).unwrap_err();
        assert_eq!(calls, 0);
        assert_eq!(
            err.to_string(),
            "compile script failed: exited with code 2: syntax error"
        );
    }

    #[test]
    fn cleanup_failure_is_not_fatal() {
        let (_dir, store) = store_with("/bin/cat", None, Some("exit 1"));
        store.add_test("cat", b"x", b"x").unwrap();
        let report = run_testset(&store, "cat", None, |_| {}).unwrap();
        assert!(report.all_accepted());
    }

    #[test]
    fn empty_set_has_empty_report() {
        let (_dir, store) = store_with("/bin/cat", None, None);
        let report = run_testset(&store, "cat", None, |_| {}).unwrap();
        assert_eq!(report.total(), 0);
        assert!(report.all_accepted());
    }
}
