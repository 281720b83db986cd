//! Execution layer: submission launch, reaping, and output capture
//!
//! # Features
//!
//! - **Submission**: program, arguments, environment, working directory
//! - **Process launch**: piped stdio, own process group, rlimit backstop
//! - **Reaping**: exit status plus kernel rusage (CPU time, peak RSS)
//! - **Capture**: incremental stdout/stderr buffers that survive a kill

pub mod capture;
pub mod process;
pub mod submission;

pub use capture::{spawn_reader, OutputCapture, ReaderHandle};
pub use judge_checker::CapturedOutput;
pub use process::{feed_input, spawn, ExitState, Reaped, SpawnedProcess};
pub use submission::Submission;
