//! judge-rs: judge verdict engine for Linux
//!
//! Runs one untrusted submission against one test case under wall-clock and
//! memory limits, captures its standard output, and classifies the run into
//! exactly one verdict.
//!
//! # Modules
//!
//! - **execution**: Submission launch, reaping, and output capture
//! - **monitoring**: Resident memory of the submission and its children, via /proc
//! - **limiter**: Three-way race between exit, deadline, and memory breach
//! - **engine**: Verdict engine orchestration
//!
//! # Example
//!
//! ```ignore
//! use judge_rs::{ComparisonPolicy, ExpectedOutput, Limits, Submission, VerdictEngine};
//!
//! let engine = VerdictEngine::builder().build()?;
//! let verdict = engine.evaluate(
//!     Submission::new("./solution"),
//!     b"5\n",
//!     &ExpectedOutput::new("5"),
//!     Limits::parse(2000, "64M")?,
//!     &ComparisonPolicy::ExactToken,
//! );
//! println!("{}", verdict);
//! ```

pub mod engine;
pub mod execution;
pub mod limiter;
pub mod monitoring;

pub use engine::{EngineConfig, Phase, VerdictEngine, VerdictEngineBuilder};
pub use execution::{CapturedOutput, ExitState, OutputCapture, SpawnedProcess, Submission};
pub use limiter::{ResourceLimiter, RlimitConfig, Supervision, TerminationCause, Terminator};
pub use monitoring::{ProcessMonitor, ProcessState, ProcessStats, TreeSample};

pub use judge_checker::{
    compare, CheckOutcome, Checker, ComparisonPolicy, ExpectedOutput, Mismatch, StandardChecker,
    DEFAULT_DEBUG_MARKER,
};
pub use judge_core::{
    self as core, util, JudgeError, Limits, ResourceUsage, Result, Verdict, VerdictKind,
};
