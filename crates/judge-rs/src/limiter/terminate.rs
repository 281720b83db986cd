//! One-shot kill of a submission and its process group

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

/// Sends SIGKILL to a process and every member of its process group.
///
/// Only the first `terminate` call signals; later calls are no-ops, so a
/// second watcher firing after a kill changes nothing. The pid stays valid
/// until the owner reaps it, which happens strictly after any kill.
#[derive(Debug)]
pub struct Terminator {
    pid: Pid,
    fired: AtomicBool,
}

impl Terminator {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            fired: AtomicBool::new(false),
        }
    }

    /// Kill the process tree. Returns true if this call delivered the kill.
    pub fn terminate(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!("Killing process group {}", self.pid);
        self.signal_group();
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Kill any descendants left in the group after the leader exited on its
    /// own. Does not count as a termination.
    pub fn sweep(&self) {
        if self.pid.as_raw() > 1 {
            let _ = killpg(self.pid, Signal::SIGKILL);
        }
    }

    fn signal_group(&self) {
        // pid 0 and 1 would address our own group or init
        if self.pid.as_raw() <= 1 {
            return;
        }
        let _ = kill(self.pid, Signal::SIGKILL);
        let _ = killpg(self.pid, Signal::SIGKILL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_is_one_shot() {
        // pid 1 is never signalled; only the guard is exercised here
        let terminator = Terminator::new(Pid::from_raw(1));
        assert!(!terminator.has_fired());
        assert!(terminator.terminate());
        assert!(terminator.has_fired());
        assert!(!terminator.terminate());
    }
}
