//! Resource limiter: races process exit against the wall-clock deadline and
//! the resident-memory ceiling.
//!
//! Two watcher threads feed one channel:
//!
//! - an exit watcher blocked in `waitid(WEXITED | WNOWAIT)`, which observes
//!   the exit without reaping, so the pid cannot be recycled under a kill
//! - a memory sampler summing the RSS of the process and its descendants
//!   from /proc every `sample_interval`
//!
//! The supervising thread waits on the channel with the remaining time as its
//! timeout. Whichever arrives first decides the cause; a breach kills the
//! whole process group exactly once. The process is reaped only after both
//! watchers are joined.
//!
//! A CPU-bound submission with several threads can burn through the
//! RLIMIT_CPU backstop before the wall-clock deadline. The kernel's kill then
//! shows up as a plain exit, so the reaped status and CPU time are checked
//! against the backstop and such a run is reported as a time-limit kill.

pub mod rlimit;
pub mod terminate;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use judge_core::util::format_bytes;
use judge_core::{JudgeError, Limits, ResourceUsage, Result};
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::{waitid, Id, WaitPidFlag};
use nix::unistd::Pid;

use crate::execution::{ExitState, SpawnedProcess};
use crate::monitoring::ProcessMonitor;

pub use rlimit::RlimitConfig;
pub use terminate::Terminator;

/// Default interval between resident-memory samples
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(5);

/// CPU time accounting may trail the kernel's own check by a tick or so
const CPU_LIMIT_SLACK_MS: u64 = 100;

/// Message sent by a watcher thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    Exited,
    MemoryExceeded { rss_bytes: u64 },
}

/// Why the submission stopped running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    /// Ended on its own
    Exited(ExitState),
    /// Killed at the wall-clock deadline
    TimeLimitExceeded { elapsed: Duration },
    /// Killed after a sample above the memory ceiling
    MemoryLimitExceeded { rss_bytes: u64 },
    /// Killed by the kernel at the RLIMIT_CPU backstop
    CpuLimitExceeded { cpu_time_ms: u64, limit_secs: u64 },
}

impl TerminationCause {
    /// True if the limiter killed the process
    pub fn is_forced(&self) -> bool {
        !matches!(self, TerminationCause::Exited(_))
    }
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationCause::Exited(state) => write!(f, "{}", state),
            TerminationCause::TimeLimitExceeded { elapsed } => {
                write!(f, "time limit exceeded after {} ms", elapsed.as_millis())
            }
            TerminationCause::MemoryLimitExceeded { rss_bytes } => {
                write!(f, "memory limit exceeded at {}", format_bytes(*rss_bytes))
            }
            TerminationCause::CpuLimitExceeded {
                cpu_time_ms,
                limit_secs,
            } => write!(
                f,
                "CPU limit of {} s exceeded after {} ms of CPU time",
                limit_secs, cpu_time_ms
            ),
        }
    }
}

/// Outcome of supervising one run
#[derive(Debug, Clone, Copy)]
pub struct Supervision {
    pub cause: TerminationCause,
    pub usage: ResourceUsage,
}

/// Enforces wall-clock and memory limits on a spawned submission
#[derive(Debug, Clone)]
pub struct ResourceLimiter {
    sample_interval: Duration,
}

impl Default for ResourceLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL)
    }
}

impl ResourceLimiter {
    pub fn new(sample_interval: Duration) -> Self {
        Self { sample_interval }
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    /// Supervise `process` until it exits or breaches a limit, then reap it.
    ///
    /// On error the process is left unreaped; dropping it kills and reaps.
    pub fn watch(&self, process: &mut SpawnedProcess, limits: &Limits) -> Result<Supervision> {
        let pid = process.pid();
        let started = process.started();
        let (tx, rx) = channel();
        let stop = Arc::new(AtomicBool::new(false));
        let peak = Arc::new(AtomicU64::new(0));

        let exit_watcher = spawn_exit_watcher(pid, tx.clone())?;
        let sampler = spawn_memory_sampler(
            pid,
            limits.memory_bytes,
            self.sample_interval,
            Arc::clone(&stop),
            Arc::clone(&peak),
            tx,
        );
        let sampler = match sampler {
            Ok(handle) => handle,
            Err(e) => {
                process.terminator().terminate();
                let _ = exit_watcher.join();
                return Err(e);
            }
        };

        let deadline = started + limits.time_limit();
        let first = rx.recv_timeout(deadline.saturating_duration_since(Instant::now()));
        let elapsed = started.elapsed();

        let breach = match first {
            Ok(WatchEvent::Exited) => None,
            Ok(WatchEvent::MemoryExceeded { rss_bytes }) => {
                Some(TerminationCause::MemoryLimitExceeded { rss_bytes })
            }
            Err(RecvTimeoutError::Timeout) => Some(TerminationCause::TimeLimitExceeded { elapsed }),
            Err(RecvTimeoutError::Disconnected) => {
                process.terminator().terminate();
                stop.store(true, Ordering::Release);
                let _ = exit_watcher.join();
                let _ = sampler.join();
                return Err(JudgeError::ProcessMonitoring(format!(
                    "watchers for pid {} stopped without reporting",
                    pid
                )));
            }
        };

        match &breach {
            Some(cause) => {
                debug!("pid {}: {}", pid, cause);
                process.terminator().terminate();
            }
            None => process.terminator().sweep(),
        }

        stop.store(true, Ordering::Release);
        if exit_watcher.join().is_err() {
            warn!("exit watcher for pid {} panicked", pid);
        }
        if sampler.join().is_err() {
            warn!("memory sampler for pid {} panicked", pid);
        }

        let reaped = process.reap()?;
        debug!(
            "pid {} reaped: {} (cpu {} ms, kernel maxrss {})",
            pid,
            reaped.exit,
            reaped.cpu_time_ms,
            format_bytes(reaped.max_rss_bytes)
        );

        let cause = breach.unwrap_or_else(|| {
            match process.cpu_limit_secs() {
                Some(limit_secs) if cpu_limit_hit(reaped.exit, reaped.cpu_time_ms, limit_secs) => {
                    debug!("pid {}: killed at the {} s CPU backstop", pid, limit_secs);
                    TerminationCause::CpuLimitExceeded {
                        cpu_time_ms: reaped.cpu_time_ms,
                        limit_secs,
                    }
                }
                _ => TerminationCause::Exited(reaped.exit),
            }
        });
        let sampled_peak = peak.load(Ordering::Acquire);
        let peak_memory_bytes = match cause {
            TerminationCause::MemoryLimitExceeded { rss_bytes } => sampled_peak.max(rss_bytes),
            _ => sampled_peak,
        };

        Ok(Supervision {
            cause,
            usage: ResourceUsage {
                wall_time_ms: elapsed.as_millis() as u64,
                cpu_time_ms: reaped.cpu_time_ms,
                peak_memory_bytes,
            },
        })
    }
}

/// True if a process that ended with `exit` after `cpu_time_ms` of CPU was
/// killed by an RLIMIT_CPU of `limit_secs`
pub fn cpu_limit_hit(exit: ExitState, cpu_time_ms: u64, limit_secs: u64) -> bool {
    let by_kernel = matches!(
        exit,
        ExitState::Signal(signo) if signo == libc::SIGKILL || signo == libc::SIGXCPU
    );
    by_kernel && cpu_time_ms + CPU_LIMIT_SLACK_MS >= limit_secs.saturating_mul(1000)
}

fn spawn_exit_watcher(pid: Pid, tx: Sender<WatchEvent>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("judge-exit".to_string())
        .spawn(move || {
            loop {
                match waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
                    Err(Errno::EINTR) => continue,
                    Ok(_) => break,
                    Err(e) => {
                        debug!("waitid({}) failed: {}", pid, e);
                        break;
                    }
                }
            }
            let _ = tx.send(WatchEvent::Exited);
        })
        .map_err(JudgeError::Io)
}

fn spawn_memory_sampler(
    pid: Pid,
    limit_bytes: u64,
    interval: Duration,
    stop: Arc<AtomicBool>,
    peak: Arc<AtomicU64>,
    tx: Sender<WatchEvent>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("judge-memory".to_string())
        .spawn(move || {
            let monitor = match ProcessMonitor::new(pid) {
                Ok(monitor) => monitor,
                Err(e) => {
                    debug!("memory sampler not started: {}", e);
                    return;
                }
            };

            while !stop.load(Ordering::Acquire) {
                let sample = match monitor.sample_tree() {
                    Ok(sample) => sample,
                    Err(_) => break,
                };
                if sample.state.has_exited() {
                    break;
                }
                peak.fetch_max(sample.rss_bytes, Ordering::AcqRel);

                if sample.rss_bytes > limit_bytes {
                    let _ = tx.send(WatchEvent::MemoryExceeded {
                        rss_bytes: sample.rss_bytes,
                    });
                    break;
                }
                thread::sleep(interval);
            }
        })
        .map_err(JudgeError::Io)
}
