// SPDX-License-Identifier: MIT

//! Linux `/proc` readers backing `DaemonMemoryUsageMB` on `ping` and the
//! self-metrics reporter. No cross-platform fallback: the daemon targets
//! Linux, matching the rest of the example pack's process-supervisor tooling.

use std::fs;

/// Resident set size of `pid` in megabytes, or `None` if `/proc/<pid>/status`
/// can't be read (process gone, non-Linux, permission denied).
pub fn resident_memory_mb(pid: u32) -> Option<f64> {
    let contents = fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kb: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb as f64 / 1024.0);
        }
    }
    None
}

/// Resident set size of the current process.
pub fn self_memory_mb() -> Option<f64> {
    resident_memory_mb(std::process::id())
}

/// `Threads:` from `/proc/self/status`.
pub fn self_thread_count() -> Option<u32> {
    let contents = fs::read_to_string("/proc/self/status").ok()?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("Threads:") {
            return rest.trim().parse().ok();
        }
    }
    None
}

/// Number of open file descriptors, used as the `handle_count` facet of a
/// self-reported metric sample.
pub fn self_fd_count() -> Option<u32> {
    fs::read_dir("/proc/self/fd").ok().map(|entries| entries.count() as u32)
}

/// Sum of user + system CPU ticks consumed by this process (fields 14 and 15
/// of `/proc/self/stat`), in the kernel's `CLK_TCK` units.
fn self_cpu_ticks() -> Option<u64> {
    let contents = fs::read_to_string("/proc/self/stat").ok()?;
    // Fields after the `(comm)` field can't be split on plain whitespace if
    // comm itself contains a space or parenthesis; skip past the last `)`.
    let after_comm = contents.rsplit_once(')')?.1;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // Field indices here are 1-based from `stat(5)`; state is field 3, so
    // utime (14) and stime (15) are fields[10] and fields[11] of this slice.
    let utime: u64 = fields.get(11).and_then(|s| s.parse().ok())?;
    let stime: u64 = fields.get(12).and_then(|s| s.parse().ok())?;
    Some(utime + stime)
}

/// Ticks per second assumed for `/proc/self/stat` CPU fields; 100 Hz is the
/// kernel default (`USER_HZ`) on every mainstream Linux distribution.
const CLK_TCK: u64 = 100;

/// Tracks consecutive CPU-tick samples to derive a percentage between calls.
pub struct CpuUsageSampler {
    last_ticks: Option<u64>,
    last_instant: std::time::Instant,
}

impl Default for CpuUsageSampler {
    fn default() -> Self {
        Self { last_ticks: None, last_instant: std::time::Instant::now() }
    }
}

impl CpuUsageSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentage of one logical CPU consumed since the last call (0 on the
    /// first call, since there's no prior sample to diff against).
    pub fn sample(&mut self) -> f64 {
        let now = std::time::Instant::now();
        let Some(ticks) = self_cpu_ticks() else { return 0.0 };

        let percentage = match self.last_ticks {
            Some(last) => {
                let elapsed = now.duration_since(self.last_instant).as_secs_f64();
                if elapsed <= 0.0 {
                    0.0
                } else {
                    let cpu_seconds = (ticks.saturating_sub(last)) as f64 / CLK_TCK as f64;
                    (cpu_seconds / elapsed) * 100.0
                }
            }
            None => 0.0,
        };

        self.last_ticks = Some(ticks);
        self.last_instant = now;
        percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_memory_mb_reads_a_positive_value_on_linux() {
        let mb = self_memory_mb();
        assert!(mb.is_none_or(|v| v > 0.0));
    }

    #[test]
    fn resident_memory_mb_is_none_for_a_dead_pid() {
        assert_eq!(resident_memory_mb(u32::MAX), None);
    }

    #[test]
    fn self_thread_count_is_at_least_one() {
        assert!(self_thread_count().is_none_or(|n| n >= 1));
    }

    #[test]
    fn cpu_usage_sampler_reports_zero_on_first_sample() {
        let mut sampler = CpuUsageSampler::new();
        assert_eq!(sampler.sample(), 0.0);
    }
}
