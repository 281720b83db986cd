//! Monitoring layer: resident memory of a process tree, sampled via /proc

pub mod monitor;

pub use monitor::{descendants, ProcessMonitor, ProcessState, ProcessStats, TreeSample};
