use std::fs;
use std::io::{self, Write};
use std::path::Path;

use console::{style, StyledObject};
use judge_checker::{ComparisonPolicy, ExpectedOutput, StandardChecker};
use judge_core::{Limits, Result, Verdict, VerdictKind};
use judge_rs::{Submission, VerdictEngine};
use log::info;

use crate::runner::{run_testset, TestResult};
use crate::store::{InitOutcome, TestStore};
use crate::templates::{SetOptions, Template};

fn marker(kind: VerdictKind) -> StyledObject<&'static str> {
    match kind {
        VerdictKind::Accepted => style("✓").green().bold(),
        VerdictKind::TimeLimitExceeded | VerdictKind::MemoryLimitExceeded => {
            style("!").yellow().bold()
        }
        _ => style("✗").red().bold(),
    }
}

fn verdict_line(label: &str, verdict: &Verdict) -> String {
    let mut line = format!(
        "{} {} [ {} ]",
        marker(verdict.kind),
        style(label).bold(),
        style(&verdict.usage).dim()
    );
    if !verdict.is_accepted() {
        line.push_str(&format!(" {}", style(verdict.kind.code()).bold()));
        if !verdict.detail.is_empty() {
            line.push_str(&format!(": {}", verdict.detail));
        }
    }
    line
}

/// Evaluate one program against one input/expected pair
pub fn run_single(
    program: String,
    args: Vec<String>,
    input: &Path,
    expected: &Path,
    limits: Limits,
    policy: ComparisonPolicy,
    debug_marker: &str,
) -> Result<bool> {
    let input = fs::read(input)?;
    let expected = ExpectedOutput::new(fs::read_to_string(expected)?);
    policy.validate()?;
    limits.validate()?;

    info!("Evaluating {} with the {} checker", program, policy.name());
    let checker = StandardChecker::new(policy).with_debug_marker(debug_marker);
    let label = program.clone();
    let verdict = VerdictEngine::default().evaluate_with(
        Submission::new(program).args(args),
        &input,
        &expected,
        limits,
        &checker,
    );

    println!("{}", verdict_line(&label, &verdict));
    Ok(verdict.is_accepted())
}

pub fn init(root: &Path, force: bool) -> Result<()> {
    let (store, outcome) = TestStore::init(root, force)?;
    match outcome {
        InitOutcome::Created => println!("Initialized {}", store.root().display()),
        InitOutcome::Reset => println!("Reset {}", store.root().display()),
        InitOutcome::AlreadyInitialized => println!(
            "{} already initialized; use --force to reset",
            store.root().display()
        ),
    }
    Ok(())
}

pub fn add_set(root: &Path, name: &str, template: Template, options: SetOptions) -> Result<()> {
    let store = TestStore::open(root)?;
    let testset = template.build(name, options)?;
    let summary = format!(
        "{} ms / {} / {}",
        testset.limits.time_ms,
        judge_core::util::format_bytes(testset.limits.memory_bytes),
        testset.checker.name()
    );
    store.add_set(name, testset)?;
    println!("Added test set {} [ {} ]", style(name).bold(), summary);
    Ok(())
}

pub fn add_test(root: &Path, set: &str, input: &Path, output: &Path) -> Result<()> {
    let store = TestStore::open(root)?;
    let number = store.add_test(set, &fs::read(input)?, &fs::read(output)?)?;
    println!("Added test {} to {}", style(number).bold(), set);
    Ok(())
}

pub fn cat(root: &Path, set: &str, number: u32, input_only: bool, output_only: bool) -> Result<()> {
    let store = TestStore::open(root)?;
    let case = store.read_test(set, number)?;
    let mut stdout = io::stdout().lock();

    if input_only {
        stdout.write_all(&case.input)?;
    } else if output_only {
        stdout.write_all(&case.output)?;
    } else {
        writeln!(stdout, "{}", style("input:").dim())?;
        stdout.write_all(&case.input)?;
        if !case.input.ends_with(b"\n") {
            writeln!(stdout)?;
        }
        writeln!(stdout, "{}", style("output:").dim())?;
        stdout.write_all(&case.output)?;
    }
    stdout.flush()?;
    Ok(())
}

/// Run a test set; true when every test was accepted
pub fn test(root: &Path, set: &str, selection: Option<&str>) -> Result<bool> {
    let store = TestStore::open(root)?;
    let report = run_testset(&store, set, selection, |result: &TestResult| {
        println!(
            "{}",
            verdict_line(&result.number.to_string(), &result.verdict)
        );
    })?;

    let summary = format!("{}/{} tests passed", report.passed(), report.total());
    if report.all_accepted() {
        println!("{}", style(summary).green().bold());
    } else {
        println!("{}", style(summary).red().bold());
    }
    Ok(report.all_accepted())
}

pub fn list_templates() {
    info!("Listing test set templates");
    println!("Available templates:\n");

    for template in Template::all() {
        println!(
            "  {:8} - {}",
            format!("{:?}", template).to_lowercase(),
            template.description()
        );
        println!("             {}", template.details());
        println!();
    }

    println!("Use add-set --template <TEMPLATE> to start from a template");
    println!("{{name}} in scripts is replaced by the test set name");
}
