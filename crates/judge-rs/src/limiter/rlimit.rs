//! setrlimit-based backstop limits applied in the child before exec
//!
//! The wall-clock and resident-memory limits are enforced by the supervisor.
//! These kernel limits only catch what sampling cannot: a CPU-bound
//! submission whose supervisor stalls, runaway output files, fd leaks.

use std::io;

use judge_core::Limits;

/// Resource limits via setrlimit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RlimitConfig {
    /// Maximum address space size in bytes (RLIMIT_AS)
    pub max_address_space: Option<u64>,
    /// Maximum CPU time in seconds (RLIMIT_CPU)
    pub max_cpu_seconds: Option<u64>,
    /// Maximum number of processes for the user (RLIMIT_NPROC)
    pub max_processes: Option<u64>,
    /// Maximum file size in bytes (RLIMIT_FSIZE)
    pub max_file_size: Option<u64>,
    /// Maximum number of open files (RLIMIT_NOFILE)
    pub max_open_files: Option<u64>,
}

impl RlimitConfig {
    /// CPU backstop of one second past the rounded-up wall-clock limit
    pub fn cpu_backstop(limits: &Limits) -> Self {
        Self {
            max_cpu_seconds: Some(limits.time_limit_secs_ceil() + 1),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the limits to the calling process.
    ///
    /// Runs between fork and exec: it must not allocate, so errors carry only
    /// the OS error code.
    pub fn apply_in_child(&self) -> io::Result<()> {
        if let Some(bytes) = self.max_address_space {
            set_rlimit(libc::RLIMIT_AS, bytes)?;
        }
        if let Some(cpu) = self.max_cpu_seconds {
            set_rlimit(libc::RLIMIT_CPU, cpu)?;
        }
        if let Some(nproc) = self.max_processes {
            set_rlimit(libc::RLIMIT_NPROC, nproc)?;
        }
        if let Some(fsize) = self.max_file_size {
            set_rlimit(libc::RLIMIT_FSIZE, fsize)?;
        }
        if let Some(nofile) = self.max_open_files {
            set_rlimit(libc::RLIMIT_NOFILE, nofile)?;
        }
        Ok(())
    }
}

fn set_rlimit(resource: libc::__rlimit_resource_t, limit: u64) -> io::Result<()> {
    let rlim = libc::rlimit {
        rlim_cur: limit,
        rlim_max: limit,
    };

    // SAFETY: rlim is a valid rlimit for the duration of the call.
    let ret = unsafe { libc::setrlimit(resource, &rlim) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
