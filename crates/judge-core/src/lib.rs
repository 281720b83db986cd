//! judge-core: shared types, errors, and helpers for judge-rs
//!
//! This crate provides the foundational types used by all judge-rs crates:
//! - Error types and Result alias
//! - Resource limits supplied per evaluation
//! - The verdict value produced by an evaluation
//! - Utility functions (memory size parsing and formatting, test selection)

pub mod error;
pub mod limits;
pub mod util;
pub mod verdict;

pub use error::{JudgeError, Result};
pub use limits::Limits;
pub use verdict::{ResourceUsage, Verdict, VerdictKind};
