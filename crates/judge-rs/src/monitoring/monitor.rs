//! Process monitoring via /proc
//!
//! Reads run state and resident set size from `/proc/<pid>/stat`. The memory
//! sampler in the limiter polls [`ProcessMonitor::sample_tree`] at a fixed
//! interval, so memory held by forked children counts against the limit
//! together with the submission's own.

use std::fs;
use std::path::Path;

use nix::unistd::Pid;

use judge_core::{JudgeError, Result};

/// Process state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Sleeping,
    /// Uninterruptible sleep, usually I/O or page faults
    DiskSleep,
    Stopped,
    /// Exited but not yet reaped
    Zombie,
    Dead,
    Unknown,
}

impl ProcessState {
    /// Parse state from the /proc stat state character
    pub fn from_char(c: char) -> Self {
        match c {
            'R' => ProcessState::Running,
            'S' | 'I' => ProcessState::Sleeping,
            'D' => ProcessState::DiskSleep,
            'T' | 't' => ProcessState::Stopped,
            'Z' => ProcessState::Zombie,
            'X' | 'x' => ProcessState::Dead,
            _ => ProcessState::Unknown,
        }
    }

    /// True once the process has exited, whether or not it has been reaped
    pub fn has_exited(&self) -> bool {
        matches!(self, ProcessState::Zombie | ProcessState::Dead)
    }
}

/// Snapshot of one process
#[derive(Debug, Clone, Copy)]
pub struct ProcessStats {
    pub pid: i32,
    /// Resident set size in bytes
    pub rss_bytes: u64,
    pub state: ProcessState,
}

impl ProcessStats {
    /// Read a snapshot for `pid` from /proc
    pub fn from_proc(pid: i32) -> Result<Self> {
        let stat_path = format!("/proc/{}/stat", pid);
        let content = fs::read_to_string(&stat_path).map_err(|e| {
            JudgeError::ProcessMonitoring(format!("Failed to read {}: {}", stat_path, e))
        })?;
        Self::parse(pid, &content)
    }

    /// Parse the contents of a /proc/<pid>/stat file.
    ///
    /// The command name is parenthesised and may itself contain spaces or
    /// parentheses, so fields are counted from the last `)`.
    pub fn parse(pid: i32, content: &str) -> Result<Self> {
        let after_comm = content
            .rfind(')')
            .map(|idx| &content[idx + 1..])
            .ok_or_else(|| JudgeError::ProcessMonitoring("Invalid /proc/stat format".to_string()))?;

        // fields[0] is field 3 (state) of proc(5), fields[21] is field 24 (rss)
        let fields: Vec<&str> = after_comm.split_whitespace().collect();
        if fields.len() < 22 {
            return Err(JudgeError::ProcessMonitoring(
                "Invalid /proc/stat format".to_string(),
            ));
        }

        let state = ProcessState::from_char(fields[0].chars().next().unwrap_or('?'));
        let rss_pages: i64 = fields[21]
            .parse()
            .map_err(|_| JudgeError::ProcessMonitoring("Invalid rss".to_string()))?;
        let rss_bytes = (rss_pages.max(0) as u64).saturating_mul(page_size());

        Ok(ProcessStats {
            pid,
            rss_bytes,
            state,
        })
    }
}

fn page_size() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    value.max(0) as u64
}

/// Memory held by a process and everything it forked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSample {
    /// State of the root process
    pub state: ProcessState,
    /// Resident set size summed over the root and its live descendants
    pub rss_bytes: u64,
    /// Number of processes counted, root included
    pub processes: usize,
}

/// Live descendants of `pid`, found through `/proc/<pid>/task/<tid>/children`.
///
/// Processes that exit while the tree is walked are skipped.
pub fn descendants(pid: Pid) -> Vec<Pid> {
    let mut found: Vec<Pid> = Vec::new();
    let mut pending = vec![pid];

    while let Some(parent) = pending.pop() {
        let Ok(tasks) = fs::read_dir(format!("/proc/{}/task", parent.as_raw())) else {
            continue;
        };
        for task in tasks.flatten() {
            let Ok(list) = fs::read_to_string(task.path().join("children")) else {
                continue;
            };
            for raw in list.split_whitespace().filter_map(|s| s.parse::<i32>().ok()) {
                let child = Pid::from_raw(raw);
                if child != pid && !found.contains(&child) {
                    found.push(child);
                    pending.push(child);
                }
            }
        }
    }
    found
}

/// Samples one submission's process tree
pub struct ProcessMonitor {
    pid: Pid,
}

impl ProcessMonitor {
    /// Create new monitor for process
    pub fn new(pid: Pid) -> Result<Self> {
        let stat_path = format!("/proc/{}/stat", pid.as_raw());
        if !Path::new(&stat_path).exists() {
            return Err(JudgeError::ProcessMonitoring(format!(
                "Process {} not found",
                pid
            )));
        }
        Ok(ProcessMonitor { pid })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Current statistics of the root process
    pub fn collect_stats(&self) -> Result<ProcessStats> {
        ProcessStats::from_proc(self.pid.as_raw())
    }

    /// Root state plus resident memory of the whole tree.
    ///
    /// Fails only if the root itself cannot be read.
    pub fn sample_tree(&self) -> Result<TreeSample> {
        let root = self.collect_stats()?;
        let mut sample = TreeSample {
            state: root.state,
            rss_bytes: root.rss_bytes,
            processes: 1,
        };

        for child in descendants(self.pid) {
            if let Ok(stats) = ProcessStats::from_proc(child.as_raw()) {
                sample.rss_bytes = sample.rss_bytes.saturating_add(stats.rss_bytes);
                sample.processes += 1;
            }
        }
        Ok(sample)
    }
}
