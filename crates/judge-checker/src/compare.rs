//! Output comparison

use std::fmt;

use judge_core::{util, VerdictKind};

use crate::output::{CapturedOutput, ExpectedOutput};
use crate::policy::ComparisonPolicy;
use crate::tokenize::{self, DEFAULT_DEBUG_MARKER};

/// Why an output was rejected. Positions and lines are 1-based and count
/// only significant (non-debug) content.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    TokenCount {
        expected: usize,
        actual: usize,
    },
    Token {
        position: usize,
        expected: String,
        actual: String,
    },
    Tolerance {
        position: usize,
        expected: f64,
        actual: f64,
        abs_error: f64,
        rel_error: f64,
    },
    /// Token could not be read as a finite number
    Malformed {
        position: usize,
        token: String,
    },
    LineCount {
        expected: usize,
        actual: usize,
    },
    Line {
        line: usize,
        expected: String,
        actual: String,
    },
    /// Same tokens, different whitespace or line breaks
    Layout {
        line: usize,
    },
    /// Standard output grew past the engine's capture cap
    OutputLimit {
        limit: usize,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::TokenCount { expected, actual } => {
                write!(f, "expected {} tokens, found {}", expected, actual)
            }
            Mismatch::Token {
                position,
                expected,
                actual,
            } => write!(
                f,
                "token {}: expected `{}`, found `{}`",
                position, expected, actual
            ),
            Mismatch::Tolerance {
                position,
                expected,
                actual,
                abs_error,
                rel_error,
            } => write!(
                f,
                "token {}: expected {}, found {} (absolute error {:.3e}, relative error {:.3e})",
                position, expected, actual, abs_error, rel_error
            ),
            Mismatch::Malformed { position, token } => {
                write!(f, "token {}: `{}` is not a finite number", position, token)
            }
            Mismatch::LineCount { expected, actual } => {
                write!(f, "expected {} lines, found {}", expected, actual)
            }
            Mismatch::Line {
                line,
                expected,
                actual,
            } => write!(
                f,
                "line {}: expected `{}`, found `{}`",
                line, expected, actual
            ),
            Mismatch::Layout { line } => {
                write!(f, "line {}: tokens match but the layout differs", line)
            }
            Mismatch::OutputLimit { limit } => {
                write!(f, "output exceeded {}", util::format_bytes(*limit as u64))
            }
        }
    }
}

/// Result of comparing expected against actual output
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Accepted,
    WrongAnswer(Mismatch),
    PresentationError(Mismatch),
}

impl CheckOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CheckOutcome::Accepted)
    }

    pub fn verdict_kind(&self) -> VerdictKind {
        match self {
            CheckOutcome::Accepted => VerdictKind::Accepted,
            CheckOutcome::WrongAnswer(_) => VerdictKind::WrongAnswer,
            CheckOutcome::PresentationError(_) => VerdictKind::PresentationError,
        }
    }

    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            CheckOutcome::Accepted => None,
            CheckOutcome::WrongAnswer(m) | CheckOutcome::PresentationError(m) => Some(m),
        }
    }

    pub fn detail(&self) -> String {
        self.mismatch().map(ToString::to_string).unwrap_or_default()
    }
}

/// Anything that can grade captured output against the expected answer
pub trait Checker: Send + Sync {
    fn check(&self, expected: &ExpectedOutput, actual: &CapturedOutput) -> CheckOutcome;
}

/// Checker driven by a [`ComparisonPolicy`] and a debug-line marker
#[derive(Debug, Clone, PartialEq)]
pub struct StandardChecker {
    policy: ComparisonPolicy,
    debug_marker: String,
}

impl StandardChecker {
    pub fn new(policy: ComparisonPolicy) -> Self {
        Self {
            policy,
            debug_marker: DEFAULT_DEBUG_MARKER.to_string(),
        }
    }

    /// Use a different debug marker; an empty marker keeps every line
    pub fn with_debug_marker(mut self, marker: impl Into<String>) -> Self {
        self.debug_marker = marker.into();
        self
    }

    pub fn policy(&self) -> &ComparisonPolicy {
        &self.policy
    }

    pub fn debug_marker(&self) -> &str {
        &self.debug_marker
    }
}

impl Checker for StandardChecker {
    fn check(&self, expected: &ExpectedOutput, actual: &CapturedOutput) -> CheckOutcome {
        let actual_text = actual.text();
        let marker = self.debug_marker.as_str();
        let expected_tokens = expected.tokens(marker);
        let actual_tokens = tokenize::tokens(&actual_text, marker);

        match self.policy {
            ComparisonPolicy::ExactToken => {
                walk_tokens(expected_tokens, actual_tokens, |position, e, a| {
                    (e != a).then(|| token_mismatch(position, e, a))
                })
            }
            ComparisonPolicy::NumericTolerance { abs_eps, rel_eps } => {
                walk_tokens(expected_tokens, actual_tokens, |position, e, a| {
                    judge_number(position, e, a, abs_eps, rel_eps)
                })
            }
            ComparisonPolicy::Lines => compare_lines(expected.text(), &actual_text, marker),
        }
    }
}

impl Checker for ComparisonPolicy {
    fn check(&self, expected: &ExpectedOutput, actual: &CapturedOutput) -> CheckOutcome {
        StandardChecker::new(*self).check(expected, actual)
    }
}

/// Compare with the default debug marker
pub fn compare(
    expected: &ExpectedOutput,
    actual: &CapturedOutput,
    policy: &ComparisonPolicy,
) -> CheckOutcome {
    policy.check(expected, actual)
}

/// Walks both token streams once. The first per-token mismatch is kept, but a
/// count mismatch discovered later takes precedence over it.
fn walk_tokens<'e, 'a, E, A, F>(mut expected: E, mut actual: A, mut judge: F) -> CheckOutcome
where
    E: Iterator<Item = &'e str>,
    A: Iterator<Item = &'a str>,
    F: FnMut(usize, &str, &str) -> Option<Mismatch>,
{
    let mut position = 0;
    let mut first = None;

    loop {
        match (expected.next(), actual.next()) {
            (Some(e), Some(a)) => {
                position += 1;
                if first.is_none() {
                    first = judge(position, e, a);
                }
            }
            (None, None) => break,
            (Some(_), None) => {
                return CheckOutcome::WrongAnswer(Mismatch::TokenCount {
                    expected: position + 1 + expected.count(),
                    actual: position,
                });
            }
            (None, Some(_)) => {
                return CheckOutcome::WrongAnswer(Mismatch::TokenCount {
                    expected: position,
                    actual: position + 1 + actual.count(),
                });
            }
        }
    }

    match first {
        Some(mismatch) => CheckOutcome::WrongAnswer(mismatch),
        None => CheckOutcome::Accepted,
    }
}

fn token_mismatch(position: usize, expected: &str, actual: &str) -> Mismatch {
    Mismatch::Token {
        position,
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn parse_finite(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

// Non-numeric expected tokens (labels like YES/NO) must match exactly.
fn judge_number(
    position: usize,
    expected: &str,
    actual: &str,
    abs_eps: f64,
    rel_eps: f64,
) -> Option<Mismatch> {
    let Some(e) = parse_finite(expected) else {
        return (expected != actual).then(|| token_mismatch(position, expected, actual));
    };
    let Some(a) = parse_finite(actual) else {
        return Some(Mismatch::Malformed {
            position,
            token: actual.to_string(),
        });
    };

    let abs_error = (a - e).abs();
    let rel_error = abs_error / e.abs().max(1.0);
    if abs_error <= abs_eps || rel_error <= rel_eps {
        None
    } else {
        Some(Mismatch::Tolerance {
            position,
            expected: e,
            actual: a,
            abs_error,
            rel_error,
        })
    }
}

fn answer_lines<'a>(text: &'a str, marker: &'a str) -> Vec<&'a str> {
    let mut lines: Vec<&str> = tokenize::significant_lines(text, marker)
        .map(str::trim)
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

fn compare_lines(expected: &str, actual: &str, marker: &str) -> CheckOutcome {
    let expected_lines = answer_lines(expected, marker);
    let actual_lines = answer_lines(actual, marker);

    if expected_lines == actual_lines {
        return CheckOutcome::Accepted;
    }

    let first_diff = expected_lines
        .iter()
        .zip(&actual_lines)
        .position(|(e, a)| e != a);

    let same_tokens = expected_lines
        .iter()
        .flat_map(|line| line.split_whitespace())
        .eq(actual_lines.iter().flat_map(|line| line.split_whitespace()));
    if same_tokens {
        let line = first_diff.unwrap_or(expected_lines.len().min(actual_lines.len())) + 1;
        return CheckOutcome::PresentationError(Mismatch::Layout { line });
    }

    match first_diff {
        Some(idx) => CheckOutcome::WrongAnswer(Mismatch::Line {
            line: idx + 1,
            expected: expected_lines[idx].to_string(),
            actual: actual_lines[idx].to_string(),
        }),
        None => CheckOutcome::WrongAnswer(Mismatch::LineCount {
            expected: expected_lines.len(),
            actual: actual_lines.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(policy: ComparisonPolicy, expected: &str, actual: &str) -> CheckOutcome {
        compare(
            &ExpectedOutput::new(expected),
            &CapturedOutput::from(actual),
            &policy,
        )
    }

    #[test]
    fn exact_accepts_identical_tokens_across_whitespace() {
        let outcome = check(ComparisonPolicy::ExactToken, "1 2\n3", "1\n2   3\n\n");
        assert_eq!(outcome, CheckOutcome::Accepted);
    }

    #[test]
    fn exact_reports_first_divergent_position() {
        let outcome = check(ComparisonPolicy::ExactToken, "1 2 3", "1 5 6");
        assert_eq!(
            outcome,
            CheckOutcome::WrongAnswer(Mismatch::Token {
                position: 2,
                expected: "2".to_string(),
                actual: "5".to_string(),
            })
        );
    }

    #[test]
    fn count_mismatch_wins_over_value_mismatch() {
        let outcome = check(ComparisonPolicy::ExactToken, "1 2", "9 2 3");
        assert_eq!(
            outcome,
            CheckOutcome::WrongAnswer(Mismatch::TokenCount {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn count_mismatch_counts_remaining_expected() {
        let outcome = check(ComparisonPolicy::ExactToken, "1 2 3 4", "1");
        assert_eq!(
            outcome.mismatch(),
            Some(&Mismatch::TokenCount {
                expected: 4,
                actual: 1
            })
        );
    }

    #[test]
    fn tolerance_non_numeric_expected_matches_exactly() {
        let policy = ComparisonPolicy::within(1e-3);
        assert!(check(policy, "YES 1.0", "YES 1.0005").is_accepted());
        assert!(!check(policy, "YES 1.0", "NO 1.0").is_accepted());
    }

    #[test]
    fn tolerance_rejects_non_finite_actual() {
        let outcome = check(ComparisonPolicy::within(1.0), "1.0", "NaN");
        assert_eq!(
            outcome,
            CheckOutcome::WrongAnswer(Mismatch::Malformed {
                position: 1,
                token: "NaN".to_string()
            })
        );
    }

    #[test]
    fn tolerance_detail_names_both_errors() {
        let outcome = check(ComparisonPolicy::tolerance(0.25, 0.0), "1.0", "2.0");
        assert_eq!(outcome.verdict_kind(), VerdictKind::WrongAnswer);
        assert_eq!(
            outcome.detail(),
            "token 1: expected 1, found 2 (absolute error 1.000e0, relative error 1.000e0)"
        );
    }

    #[test]
    fn lines_accepts_trimmed_lines_and_trailing_blanks() {
        let outcome = check(ComparisonPolicy::Lines, "1 2\n3\n", "  1 2 \n3\n\n\n");
        assert!(outcome.is_accepted());
    }

    #[test]
    fn lines_layout_difference_is_presentation_error() {
        let outcome = check(ComparisonPolicy::Lines, "1 2\n3", "1\n2 3");
        assert_eq!(
            outcome,
            CheckOutcome::PresentationError(Mismatch::Layout { line: 1 })
        );
        assert_eq!(outcome.verdict_kind(), VerdictKind::PresentationError);
    }

    #[test]
    fn lines_reports_first_differing_line() {
        let outcome = check(ComparisonPolicy::Lines, "a\nb\nc", "a\nx\nc");
        assert_eq!(
            outcome,
            CheckOutcome::WrongAnswer(Mismatch::Line {
                line: 2,
                expected: "b".to_string(),
                actual: "x".to_string(),
            })
        );
    }

    #[test]
    fn lines_reports_missing_lines() {
        let outcome = check(ComparisonPolicy::Lines, "a\nb", "a");
        assert_eq!(
            outcome,
            CheckOutcome::WrongAnswer(Mismatch::LineCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn custom_marker_changes_what_is_noise() {
        let checker = StandardChecker::new(ComparisonPolicy::ExactToken).with_debug_marker("//");
        let expected = ExpectedOutput::new("5");
        assert!(checker
            .check(&expected, &CapturedOutput::from("// trace\n5\n"))
            .is_accepted());
        assert!(!checker
            .check(&expected, &CapturedOutput::from("# trace\n5\n"))
            .is_accepted());
    }

    #[test]
    fn output_limit_detail() {
        let mismatch = Mismatch::OutputLimit {
            limit: 64 * 1024 * 1024,
        };
        assert_eq!(mismatch.to_string(), "output exceeded 64.0 MiB");
    }
}
