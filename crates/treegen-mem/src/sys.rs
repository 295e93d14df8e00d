//! Hardware concurrency and memory detection.
//!
//! Memory figures come from `/proc/meminfo` on Linux. Elsewhere they are
//! reported as unknown and callers fall back to permissive defaults.

use serde::Serialize;

pub const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemResources {
    /// Logical cores (`num_cpus::get`), at least 1.
    pub cores: usize,
    pub total_bytes: Option<u64>,
    pub available_bytes: Option<u64>,
}

impl SystemResources {
    pub fn detect() -> Self {
        let (total_bytes, available_bytes) = read_meminfo();
        Self {
            cores: num_cpus::get().max(1),
            total_bytes,
            available_bytes,
        }
    }

    /// Fixed figures, for tests and callers that manage resources themselves.
    pub fn fixed(cores: usize, total_bytes: Option<u64>, available_bytes: Option<u64>) -> Self {
        Self {
            cores: cores.max(1),
            total_bytes,
            available_bytes,
        }
    }

    /// Worker count: `min(cores, cap)`, or every core when total memory
    /// exceeds 64 GiB. Unknown total memory counts as 8 GiB.
    pub fn worker_threads(&self, cap: usize) -> usize {
        let total = self.total_bytes.unwrap_or(8 * GIB);
        if total > 64 * GIB {
            self.cores
        } else {
            self.cores.min(cap.max(1))
        }
    }
}

#[cfg(target_os = "linux")]
fn read_meminfo() -> (Option<u64>, Option<u64>) {
    match std::fs::read_to_string("/proc/meminfo") {
        Ok(text) => parse_meminfo(&text),
        Err(_) => (None, None),
    }
}

#[cfg(not(target_os = "linux"))]
fn read_meminfo() -> (Option<u64>, Option<u64>) {
    (None, None)
}

/// Extract (MemTotal, MemAvailable) in bytes. Kernels without MemAvailable
/// fall back to MemFree.
pub fn parse_meminfo(text: &str) -> (Option<u64>, Option<u64>) {
    let mut total = None;
    let mut available = None;
    let mut free = None;
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Ok(kib) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "MemTotal:" => total = Some(kib * 1024),
            "MemAvailable:" => available = Some(kib * 1024),
            "MemFree:" => free = Some(kib * 1024),
            _ => {}
        }
    }
    (total, available.or(free))
}
