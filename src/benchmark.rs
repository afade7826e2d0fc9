use std::mem;
use std::time::Instant;

use sysinfo::{Pid, System};
use tracing::debug;

use crate::model::{Algorithm, DataStructure};

/// Timing and memory figures for one benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    /// Wall-clock time of `execute`
    pub execution_time_ms: f64,
    /// Snapshot capacity times element size
    pub memory_used_bytes: usize,
    /// Resident memory of this process after the run, when the OS reports it
    pub resident_memory_bytes: Option<u64>,
}

/// Times algorithm runs and samples process memory
pub struct BenchmarkManager {
    system: System,
    pid: Option<Pid>,
}

impl BenchmarkManager {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    /// Run `algo` over `ds` once, timing only the `execute` call
    pub fn run(&mut self, ds: &mut dyn DataStructure, algo: &mut dyn Algorithm) -> BenchmarkResult {
        let start = Instant::now();
        algo.execute(ds);
        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        let snapshot = ds.elements();
        let memory_used_bytes = snapshot.capacity() * mem::size_of::<i32>();
        let resident_memory_bytes = self.resident_memory();

        debug!(
            "{} on {}: {:.3} ms, {} B",
            algo.name(),
            ds.name(),
            execution_time_ms,
            memory_used_bytes
        );

        BenchmarkResult {
            execution_time_ms,
            memory_used_bytes,
            resident_memory_bytes,
        }
    }

    fn resident_memory(&mut self) -> Option<u64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system.process(pid).map(|process| process.memory())
    }

    /// Format bytes to human-readable format
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

impl Default for BenchmarkManager {
    fn default() -> Self {
        Self::new()
    }
}
