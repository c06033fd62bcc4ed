//! Periodic supervisory loop.
//!
//! Drives [`SafetySupervisor::cycle`](crate::supervisor::SafetySupervisor::cycle)
//! once per test pulse with drift-free absolute deadlines.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to an isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`: RT priority.
//!
//! Without the `rt` feature every step is a no-op and the loop paces
//! itself with `std::thread::sleep`.
//!
//! ## Overruns
//! A pass longer than the test pulse is logged and counted. The watchdog
//! catches a loop that stalls for good; `abort_on_overrun` turns the
//! first overrun into an error instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eso_common::clock::Clock;
use eso_common::hal::SafetyHal;
use eso_common::safety::{FaultCode, SafetyError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::shared::SharedSupervisor;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Running sum of squares for stddev computation.
    pub sum_sq_cycle_ns: i128,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            sum_sq_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.sum_sq_cycle_ns += (duration_ns as i128) * (duration_ns as i128);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }

    /// Population standard deviation of the cycle time [ns].
    pub fn stddev_cycle_ns(&self) -> f64 {
        if self.cycle_count == 0 {
            return 0.0;
        }
        let n = self.cycle_count as f64;
        let mean = self.sum_cycle_ns as f64 / n;
        let var = self.sum_sq_cycle_ns as f64 / n - mean * mean;
        var.max(0.0).sqrt()
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or loop execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Cycle overrun with `abort_on_overrun` set.
    #[error("cycle overrun: {actual_ns}ns > {budget_ns}ns budget")]
    CycleOverrun {
        /// Actual cycle duration [ns].
        actual_ns: i64,
        /// Configured cycle budget [ns].
        budget_ns: i64,
    },

    /// The supervisor rejected the pass.
    #[error("supervisor error: {0}")]
    Supervisor(#[from] SafetyError),
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop never takes a stack page fault.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusively borrowed stack location.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to one CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// SCHED_FIFO with the given priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup sequence. Call from the supervisory thread before
/// [`CycleRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    debug!("RT setup done (core {cpu_core}, priority {rt_priority})");
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Calls `cycle()` once per period until stopped.
pub struct CycleRunner<H: SafetyHal, C: Clock> {
    supervisor: SharedSupervisor<H, C>,
    running: Arc<AtomicBool>,
    period_ns: i64,
    max_cycles: Option<u64>,
    abort_on_overrun: bool,
    last_fault: FaultCode,
    pub stats: CycleStats,
}

impl<H: SafetyHal, C: Clock> CycleRunner<H, C> {
    /// Runner with the supervisor's configured test pulse as period.
    pub fn new(supervisor: SharedSupervisor<H, C>) -> Self {
        let period_ms = supervisor.lock().config().test_pulse_interval_ms;
        Self {
            supervisor,
            running: Arc::new(AtomicBool::new(true)),
            period_ns: i64::from(period_ms) * 1_000_000,
            max_cycles: None,
            abort_on_overrun: false,
            last_fault: FaultCode::None,
            stats: CycleStats::new(),
        }
    }

    /// Stop after `n` cycles.
    pub fn with_max_cycles(mut self, n: u64) -> Self {
        self.max_cycles = Some(n);
        self
    }

    pub fn with_period_ms(mut self, period_ms: u32) -> Self {
        self.period_ns = i64::from(period_ms) * 1_000_000;
        self
    }

    pub fn abort_on_overrun(mut self, abort: bool) -> Self {
        self.abort_on_overrun = abort;
        self
    }

    /// Flag that keeps the loop alive; clear it to stop after the
    /// current pass.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    #[inline]
    pub const fn period_ns(&self) -> i64 {
        self.period_ns
    }

    /// Enter the loop. Returns when the running flag is cleared, the
    /// cycle limit is reached, or on error.
    pub fn run(&mut self) -> Result<(), CycleError> {
        info!(
            "Supervisory loop started (period {} us)",
            self.period_ns / 1000
        );

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop();

        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop();

        info!(
            "Supervisory loop stopped after {} cycles (avg {} us, max {} us, {} overruns)",
            self.stats.cycle_count,
            self.stats.avg_cycle_ns() / 1000,
            self.stats.max_cycle_ns / 1000,
            self.stats.overruns
        );
        result
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.max_cycles.is_none_or(|max| self.stats.cycle_count < max)
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let mut next_wake = clock_gettime(clock)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;

        while self.should_continue() {
            next_wake = timespec_add_ns(next_wake, self.period_ns);

            let cycle_start = clock_gettime(clock)
                .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
            let wake_latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();

            self.cycle_body()?;

            let cycle_end = clock_gettime(clock)
                .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            self.stats.record(duration_ns, wake_latency_ns);
            self.check_overrun(duration_ns)?;

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self) -> Result<(), CycleError> {
        use std::time::{Duration, Instant};

        let period = Duration::from_nanos(self.period_ns as u64);
        let mut next_wake = Instant::now();

        while self.should_continue() {
            next_wake += period;
            let cycle_start = Instant::now();

            self.cycle_body()?;

            let duration_ns = cycle_start.elapsed().as_nanos() as i64;
            self.stats.record(duration_ns, 0);
            self.check_overrun(duration_ns)?;

            if let Some(remaining) = next_wake.checked_duration_since(Instant::now()) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    /// One supervisory pass; logs fault code changes.
    fn cycle_body(&mut self) -> Result<(), CycleError> {
        let fault = self.supervisor.cycle()?;
        if fault != self.last_fault {
            if fault.is_none() {
                info!("Fault cleared (was {})", self.last_fault);
            } else {
                warn!("Active fault: {fault}");
            }
            self.last_fault = fault;
        }
        Ok(())
    }

    fn check_overrun(&mut self, duration_ns: i64) -> Result<(), CycleError> {
        if duration_ns <= self.period_ns {
            return Ok(());
        }
        self.stats.overruns += 1;
        warn!(
            "Cycle overrun: {} us > {} us",
            duration_ns / 1000,
            self.period_ns / 1000
        );
        if self.abort_on_overrun {
            return Err(CycleError::CycleOverrun {
                actual_ns: duration_ns,
                budget_ns: self.period_ns,
            });
        }
        Ok(())
    }
}

/// Add nanoseconds to a `TimeSpec`, normalizing the result.
#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    while nanos < 0 {
        secs -= 1;
        nanos += 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// Difference (a - b) in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
