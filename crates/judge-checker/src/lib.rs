//! judge-checker: output comparison for judge-rs
//!
//! The checker decides Accepted / Wrong Answer once the submission is known to
//! have exited successfully. It never looks at process state and never fails:
//! malformed output is a wrong answer, not an error.
//!
//! - **tokenize**: lazy debug-line filter and whitespace tokenizer
//! - **output**: expected and captured output values
//! - **policy**: exact-token, line, and numeric-tolerance policies
//! - **compare**: the comparison itself and its mismatch reasons
//!
//! # Example
//!
//! ```
//! use judge_checker::{compare, CapturedOutput, ComparisonPolicy, ExpectedOutput};
//!
//! let expected = ExpectedOutput::new("4.0 3.0");
//! let actual = CapturedOutput::from("# debug\n4.00001 3.0\n");
//! let outcome = compare(&expected, &actual, &ComparisonPolicy::tolerance(1e-4, 0.0));
//! assert!(outcome.is_accepted());
//! ```

pub mod compare;
pub mod output;
pub mod policy;
pub mod tokenize;

pub use compare::{compare, CheckOutcome, Checker, Mismatch, StandardChecker};
pub use output::{CapturedOutput, ExpectedOutput};
pub use policy::ComparisonPolicy;
pub use tokenize::DEFAULT_DEBUG_MARKER;
