//! Submission launch and reaping
//!
//! The child runs as the leader of its own process group so a kill reaches
//! anything it forked. Resource limits are applied between fork and exec.
//! Reaping goes through wait4 so the kernel's rusage (CPU time, peak RSS) is
//! collected together with the exit status.

use std::fmt;
use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::process::{ChildStderr, ChildStdin, ChildStdout, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use judge_core::{JudgeError, Result};
use log::debug;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::execution::submission::Submission;
use crate::limiter::{RlimitConfig, Terminator};

/// How a process ended once it was reaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Normal exit with a status code
    Code(i32),
    /// Terminated by a signal
    Signal(i32),
}

impl ExitState {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitState::Code(0))
    }

    fn from_wait_status(status: libc::c_int) -> Self {
        if libc::WIFSIGNALED(status) {
            ExitState::Signal(libc::WTERMSIG(status))
        } else {
            ExitState::Code(libc::WEXITSTATUS(status))
        }
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitState::Code(code) => write!(f, "exited with code {}", code),
            ExitState::Signal(signo) => match Signal::try_from(*signo) {
                Ok(signal) => write!(f, "killed by {} ({})", signal.as_str(), signo),
                Err(_) => write!(f, "killed by signal {}", signo),
            },
        }
    }
}

/// Exit status plus kernel accounting from wait4
#[derive(Debug, Clone, Copy)]
pub struct Reaped {
    pub exit: ExitState,
    /// User plus system CPU time
    pub cpu_time_ms: u64,
    /// Peak resident set size reported by the kernel
    pub max_rss_bytes: u64,
}

/// A launched submission. Killed and reaped on drop unless already reaped.
pub struct SpawnedProcess {
    pid: Pid,
    started: Instant,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
    terminator: Terminator,
    cpu_limit_secs: Option<u64>,
    reaped: bool,
}

impl SpawnedProcess {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Instant taken immediately before the spawn
    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }

    /// RLIMIT_CPU set in the child, if any
    pub fn cpu_limit_secs(&self) -> Option<u64> {
        self.cpu_limit_secs
    }

    /// Block until the process is gone and collect its status and rusage.
    /// Must be called at most once.
    pub fn reap(&mut self) -> Result<Reaped> {
        let (status, usage) = wait4(self.pid)?;
        self.reaped = true;

        Ok(Reaped {
            exit: ExitState::from_wait_status(status),
            cpu_time_ms: timeval_ms(&usage.ru_utime) + timeval_ms(&usage.ru_stime),
            max_rss_bytes: (usage.ru_maxrss.max(0) as u64).saturating_mul(1024),
        })
    }
}

impl Drop for SpawnedProcess {
    fn drop(&mut self) {
        if !self.reaped {
            self.terminator.terminate();
            let _ = wait4(self.pid);
        }
    }
}

/// Launch a submission with piped stdio in its own process group
pub fn spawn(submission: &Submission, rlimits: Option<RlimitConfig>) -> Result<SpawnedProcess> {
    let mut command = submission.to_command()?;
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let cpu_limit_secs = rlimits.and_then(|r| r.max_cpu_seconds);
    if let Some(rlimits) = rlimits {
        // SAFETY: apply_in_child only calls setrlimit and reads errno, both
        // async-signal-safe, and allocates nothing.
        unsafe {
            command.pre_exec(move || rlimits.apply_in_child());
        }
    }

    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| JudgeError::Spawn {
        program: submission.program.clone(),
        source,
    })?;

    let raw_pid = i32::try_from(child.id())
        .map_err(|_| JudgeError::Syscall(format!("pid {} out of range", child.id())))?;
    let pid = Pid::from_raw(raw_pid);
    debug!("Spawned {} as pid {}", submission.program, pid);

    Ok(SpawnedProcess {
        pid,
        started,
        stdin: child.stdin.take(),
        stdout: child.stdout.take(),
        stderr: child.stderr.take(),
        terminator: Terminator::new(pid),
        cpu_limit_secs,
        reaped: false,
    })
}

/// Write the test input to the submission's stdin, then close it.
///
/// A submission that exits without reading its input is not an error.
pub fn feed_input(mut stdin: ChildStdin, input: Vec<u8>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("judge-stdin".to_string())
        .spawn(move || match stdin.write_all(&input) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Err(e) => debug!("stdin feed stopped early: {}", e),
        })
        .map_err(JudgeError::Io)
}

fn wait4(pid: Pid) -> Result<(libc::c_int, libc::rusage)> {
    let mut status: libc::c_int = 0;
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };

    loop {
        // SAFETY: both out-pointers refer to live locals.
        let ret = unsafe { libc::wait4(pid.as_raw(), &mut status, 0, &mut usage) };
        if ret == pid.as_raw() {
            return Ok((status, usage));
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(JudgeError::Syscall(format!("wait4({}) failed: {}", pid, err)));
    }
}

fn timeval_ms(tv: &libc::timeval) -> u64 {
    (tv.tv_sec.max(0) as u64) * 1000 + (tv.tv_usec.max(0) as u64) / 1000
}
