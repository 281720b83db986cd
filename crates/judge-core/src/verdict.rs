//! Verdict produced by one evaluation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util;

/// Classification of a submission's run against one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Accepted,
    WrongAnswer,
    RuntimeError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    PresentationError,
}

impl VerdictKind {
    /// Conventional short code (AC, WA, ...)
    pub fn code(&self) -> &'static str {
        match self {
            VerdictKind::Accepted => "AC",
            VerdictKind::WrongAnswer => "WA",
            VerdictKind::RuntimeError => "RE",
            VerdictKind::TimeLimitExceeded => "TLE",
            VerdictKind::MemoryLimitExceeded => "MLE",
            VerdictKind::PresentationError => "PE",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, VerdictKind::Accepted)
    }

    pub fn all() -> [VerdictKind; 6] {
        [
            VerdictKind::Accepted,
            VerdictKind::WrongAnswer,
            VerdictKind::RuntimeError,
            VerdictKind::TimeLimitExceeded,
            VerdictKind::MemoryLimitExceeded,
            VerdictKind::PresentationError,
        ]
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerdictKind::Accepted => "Accepted",
            VerdictKind::WrongAnswer => "Wrong Answer",
            VerdictKind::RuntimeError => "Runtime Error",
            VerdictKind::TimeLimitExceeded => "Time Limit Exceeded",
            VerdictKind::MemoryLimitExceeded => "Memory Limit Exceeded",
            VerdictKind::PresentationError => "Presentation Error",
        };
        f.write_str(name)
    }
}

/// Resources consumed by the supervised process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Wall clock time from launch to termination
    pub wall_time_ms: u64,
    /// User plus system CPU time
    pub cpu_time_ms: u64,
    /// Highest resident set size observed
    pub peak_memory_bytes: u64,
}

impl fmt::Display for ResourceUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ms / {}",
            self.wall_time_ms,
            util::format_bytes(self.peak_memory_bytes)
        )
    }
}

/// Final, immutable outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    /// Human-readable diagnostic, empty for a plain accept
    pub detail: String,
    pub usage: ResourceUsage,
}

impl Verdict {
    pub fn new(kind: VerdictKind, detail: impl Into<String>, usage: ResourceUsage) -> Self {
        Self {
            kind,
            detail: detail.into(),
            usage,
        }
    }

    pub fn accepted(usage: ResourceUsage) -> Self {
        Self::new(VerdictKind::Accepted, String::new(), usage)
    }

    pub fn is_accepted(&self) -> bool {
        self.kind.is_accepted()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<_> = VerdictKind::all().iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 6);
    }

    #[test]
    fn test_only_accepted_is_accepted() {
        for kind in VerdictKind::all() {
            assert_eq!(kind.is_accepted(), kind == VerdictKind::Accepted);
        }
    }

    #[test]
    fn test_verdict_display_with_detail() {
        let verdict = Verdict::new(
            VerdictKind::WrongAnswer,
            "token 2: expected `1`, found `hi`",
            ResourceUsage::default(),
        );
        assert_eq!(
            verdict.to_string(),
            "Wrong Answer: token 2: expected `1`, found `hi`"
        );
    }

    #[test]
    fn test_accepted_display() {
        assert_eq!(
            Verdict::accepted(ResourceUsage::default()).to_string(),
            "Accepted"
        );
    }

    #[test]
    fn test_usage_display() {
        let usage = ResourceUsage {
            wall_time_ms: 12,
            cpu_time_ms: 3,
            peak_memory_bytes: 3 * 1024 * 1024 / 2,
        };
        assert_eq!(usage.to_string(), "12 ms / 1.5 MiB");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&VerdictKind::TimeLimitExceeded).unwrap();
        assert_eq!(json, "\"time_limit_exceeded\"");
    }
}
