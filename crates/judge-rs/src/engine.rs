//! Verdict engine: one submission, one test case, one verdict

use std::fmt;
use std::time::Duration;

use judge_checker::{CheckOutcome, Checker, ComparisonPolicy, ExpectedOutput, Mismatch};
use judge_core::util::format_bytes;
use judge_core::{JudgeError, Limits, ResourceUsage, Result, Verdict, VerdictKind};
use log::{debug, warn};
use uuid::Uuid;

use crate::execution::{self, ExitState, OutputCapture, Submission};
use crate::limiter::{ResourceLimiter, RlimitConfig, TerminationCause, DEFAULT_SAMPLE_INTERVAL};

/// Prefix of the detail of verdicts caused by a judge-side failure
pub const INTERNAL_DETAIL_PREFIX: &str = "judge:";

const STDERR_HINT_MAX_CHARS: usize = 200;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval between resident-memory samples
    pub sample_interval: Duration,
    /// Stdout bytes kept for grading; output past this is a wrong answer
    pub max_output_bytes: usize,
    /// Stderr bytes kept for diagnostics
    pub max_stderr_bytes: usize,
    /// How long to wait for the pipes to close after the process is reaped
    pub drain_grace: Duration,
    /// Apply RLIMIT_CPU of ceil(time limit) + 1 s in the child
    pub cpu_backstop: bool,
    /// Optional RLIMIT_AS in bytes
    pub address_space_limit: Option<u64>,
    /// Optional RLIMIT_FSIZE in bytes
    pub file_size_limit: Option<u64>,
    /// Optional RLIMIT_NOFILE
    pub max_open_files: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            max_output_bytes: 64 * 1024 * 1024,
            max_stderr_bytes: 64 * 1024,
            drain_grace: Duration::from_millis(250),
            cpu_backstop: true,
            address_space_limit: None,
            file_size_limit: None,
            max_open_files: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval.is_zero() {
            return Err(JudgeError::InvalidConfig(
                "Sample interval must be positive".to_string(),
            ));
        }
        if self.sample_interval > Duration::from_secs(1) {
            return Err(JudgeError::InvalidConfig(
                "Sample interval must not exceed one second".to_string(),
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(JudgeError::InvalidConfig(
                "Output cap must be positive".to_string(),
            ));
        }
        if self.address_space_limit == Some(0) || self.file_size_limit == Some(0) {
            return Err(JudgeError::InvalidConfig(
                "Kernel limits must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    fn rlimits_for(&self, limits: &Limits) -> Option<RlimitConfig> {
        let mut rlimits = if self.cpu_backstop {
            RlimitConfig::cpu_backstop(limits)
        } else {
            RlimitConfig::default()
        };
        rlimits.max_address_space = self.address_space_limit;
        rlimits.max_file_size = self.file_size_limit;
        rlimits.max_open_files = self.max_open_files;

        (!rlimits.is_empty()).then_some(rlimits)
    }
}

/// Builder pattern for engine creation
#[derive(Debug, Default)]
pub struct VerdictEngineBuilder {
    config: EngineConfig,
}

impl VerdictEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.config.sample_interval = interval;
        self
    }

    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.config.max_output_bytes = bytes;
        self
    }

    /// Set the output cap from a string (e.g., "16M")
    pub fn max_output_str(self, s: &str) -> Result<Self> {
        let bytes = judge_core::util::parse_memory_size(s)?;
        let bytes = usize::try_from(bytes)
            .map_err(|_| JudgeError::InvalidConfig(format!("Output cap too large: {}", s)))?;
        Ok(self.max_output_bytes(bytes))
    }

    pub fn max_stderr_bytes(mut self, bytes: usize) -> Self {
        self.config.max_stderr_bytes = bytes;
        self
    }

    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.config.drain_grace = grace;
        self
    }

    pub fn cpu_backstop(mut self, enabled: bool) -> Self {
        self.config.cpu_backstop = enabled;
        self
    }

    pub fn address_space_limit(mut self, bytes: u64) -> Self {
        self.config.address_space_limit = Some(bytes);
        self
    }

    pub fn file_size_limit(mut self, bytes: u64) -> Self {
        self.config.file_size_limit = Some(bytes);
        self
    }

    pub fn max_open_files(mut self, count: u64) -> Self {
        self.config.max_open_files = Some(count);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<VerdictEngine> {
        self.config.validate()?;
        Ok(VerdictEngine::from_config(self.config))
    }
}

/// Lifecycle of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Running,
    Exited,
    TimedOut,
    MemoryExceeded,
    Graded,
}

impl Phase {
    fn after(cause: &TerminationCause) -> Self {
        match cause {
            TerminationCause::Exited(_) => Phase::Exited,
            TerminationCause::TimeLimitExceeded { .. }
            | TerminationCause::CpuLimitExceeded { .. } => Phase::TimedOut,
            TerminationCause::MemoryLimitExceeded { .. } => Phase::MemoryExceeded,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Pending => "pending",
            Phase::Running => "running",
            Phase::Exited => "exited",
            Phase::TimedOut => "timed-out",
            Phase::MemoryExceeded => "memory-exceeded",
            Phase::Graded => "graded",
        };
        f.write_str(name)
    }
}

/// Evaluates submissions against test cases.
///
/// Holds only configuration: any number of evaluations may run in parallel
/// on one engine.
#[derive(Debug, Clone)]
pub struct VerdictEngine {
    config: EngineConfig,
    limiter: ResourceLimiter,
}

impl Default for VerdictEngine {
    fn default() -> Self {
        Self::from_config(EngineConfig::default())
    }
}

impl VerdictEngine {
    pub fn builder() -> VerdictEngineBuilder {
        VerdictEngineBuilder::new()
    }

    fn from_config(config: EngineConfig) -> Self {
        let limiter = ResourceLimiter::new(config.sample_interval);
        Self { config, limiter }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `submission` on `input` and grade its output with `policy`.
    ///
    /// Always produces a verdict. Judge-side failures come back as
    /// RuntimeError with a detail starting with `judge:`.
    pub fn evaluate(
        &self,
        submission: Submission,
        input: &[u8],
        expected: &ExpectedOutput,
        limits: Limits,
        policy: &ComparisonPolicy,
    ) -> Verdict {
        if let Err(e) = policy.validate() {
            return internal_failure(Uuid::new_v4(), &e);
        }
        self.evaluate_with(submission, input, expected, limits, policy)
    }

    /// Like [`evaluate`](Self::evaluate) with any checker
    pub fn evaluate_with(
        &self,
        submission: Submission,
        input: &[u8],
        expected: &ExpectedOutput,
        limits: Limits,
        checker: &dyn Checker,
    ) -> Verdict {
        let id = Uuid::new_v4();
        debug!("[{}] {}: {}", id, Phase::Pending, submission.program);

        match self.run(id, &submission, input, expected, &limits, checker) {
            Ok(verdict) => {
                debug!("[{}] {}: {}", id, Phase::Graded, verdict.kind.code());
                verdict
            }
            Err(e) => internal_failure(id, &e),
        }
    }

    fn run(
        &self,
        id: Uuid,
        submission: &Submission,
        input: &[u8],
        expected: &ExpectedOutput,
        limits: &Limits,
        checker: &dyn Checker,
    ) -> Result<Verdict> {
        limits.validate()?;

        let mut process = execution::spawn(submission, self.config.rlimits_for(limits))?;
        debug!("[{}] {}: pid {}", id, Phase::Running, process.pid());

        let stdout = OutputCapture::new();
        let stderr = OutputCapture::new();

        if let Some(stdin) = process.stdin.take() {
            // detached: the writer ends with EPIPE once the child is gone
            execution::feed_input(stdin, input.to_vec())?;
        }
        let stdout_reader = match process.stdout.take() {
            Some(pipe) => Some(execution::spawn_reader(
                "stdout",
                pipe,
                stdout.clone(),
                self.config.max_output_bytes,
            )?),
            None => None,
        };
        let stderr_reader = match process.stderr.take() {
            Some(pipe) => Some(execution::spawn_reader(
                "stderr",
                pipe,
                stderr.clone(),
                self.config.max_stderr_bytes,
            )?),
            None => None,
        };

        let supervision = self.limiter.watch(&mut process, limits)?;
        debug!(
            "[{}] {}: {} ({})",
            id,
            Phase::after(&supervision.cause),
            supervision.cause,
            supervision.usage
        );

        if let Some(reader) = &stdout_reader {
            if !reader.wait(self.config.drain_grace) {
                warn!(
                    "[{}] stdout still open {} ms after exit, grading {} captured",
                    id,
                    self.config.drain_grace.as_millis(),
                    format_bytes(stdout.len() as u64)
                );
            }
        }
        if let Some(reader) = &stderr_reader {
            reader.wait(self.config.drain_grace);
        }

        Ok(self.classify(
            supervision.cause,
            supervision.usage,
            limits,
            &stdout,
            &stderr,
            expected,
            checker,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn classify(
        &self,
        cause: TerminationCause,
        usage: ResourceUsage,
        limits: &Limits,
        stdout: &OutputCapture,
        stderr: &OutputCapture,
        expected: &ExpectedOutput,
        checker: &dyn Checker,
    ) -> Verdict {
        match cause {
            TerminationCause::TimeLimitExceeded { elapsed } => Verdict::new(
                VerdictKind::TimeLimitExceeded,
                format!(
                    "killed after {} ms (limit {} ms)",
                    elapsed.as_millis(),
                    limits.time_ms
                ),
                usage,
            ),
            TerminationCause::CpuLimitExceeded {
                cpu_time_ms,
                limit_secs,
            } => Verdict::new(
                VerdictKind::TimeLimitExceeded,
                format!(
                    "CPU time reached {} ms at the {} s backstop (limit {} ms)",
                    cpu_time_ms, limit_secs, limits.time_ms
                ),
                usage,
            ),
            TerminationCause::MemoryLimitExceeded { rss_bytes } => Verdict::new(
                VerdictKind::MemoryLimitExceeded,
                format!(
                    "resident memory reached {} (limit {})",
                    format_bytes(rss_bytes),
                    format_bytes(limits.memory_bytes)
                ),
                usage,
            ),
            TerminationCause::Exited(state) if !state.is_success() => Verdict::new(
                VerdictKind::RuntimeError,
                runtime_error_detail(state, stderr),
                usage,
            ),
            TerminationCause::Exited(_) => {
                let output = stdout.snapshot();
                if output.is_truncated() {
                    let mismatch = Mismatch::OutputLimit {
                        limit: self.config.max_output_bytes,
                    };
                    return Verdict::new(VerdictKind::WrongAnswer, mismatch.to_string(), usage);
                }
                outcome_verdict(checker.check(expected, &output), usage)
            }
        }
    }
}

fn outcome_verdict(outcome: CheckOutcome, usage: ResourceUsage) -> Verdict {
    Verdict::new(outcome.verdict_kind(), outcome.detail(), usage)
}

fn runtime_error_detail(state: ExitState, stderr: &OutputCapture) -> String {
    let captured = stderr.snapshot();
    let text = captured.text();
    match text.lines().map(str::trim).find(|line| !line.is_empty()) {
        Some(line) => {
            let hint: String = line.chars().take(STDERR_HINT_MAX_CHARS).collect();
            format!("{}; stderr: {}", state, hint)
        }
        None => state.to_string(),
    }
}

fn internal_failure(id: Uuid, error: &JudgeError) -> Verdict {
    warn!("[{}] evaluation failed inside the judge: {}", id, error);
    Verdict::new(
        VerdictKind::RuntimeError,
        format!("{} {}", INTERNAL_DETAIL_PREFIX, error),
        ResourceUsage::default(),
    )
}
