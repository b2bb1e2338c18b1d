//! Progress/statistics (SPEC_FULL's ambient-stack + "per-back-end
//! statistics objects" supplement, grounded in the teacher's
//! `workers/pool.rs` `TrainingStats` trait and `lib.rs`'s `progress()`
//! helper, and in the original tool's `LearnStatisticsSAT.h`/
//! `LearnStatisticsQBF.h`). Every engine tracks counts of oracle calls,
//! counterexamples, generalization attempts/successes, clauses blocked,
//! frames advanced and restarts; the parallel coordinator sums per-worker
//! counters the same way the teacher's `Pool` sums per-`Worker` ones.

use serde::Serialize;
use std::time::{Duration, Instant};

/// Mirrors the teacher's `TrainingStats` trait shape: a small set of
/// monotonically increasing counters plus elapsed wall-clock, summable
/// across workers.
pub trait Stats {
    fn counterexamples(&self) -> usize;
    fn cubes_blocked(&self) -> usize;
    fn sat_calls(&self) -> usize;
    fn qbf_calls(&self) -> usize;
    fn restarts(&self) -> usize;
    fn elapsed(&self) -> Duration;
}

/// A plain counter bag shared by every single-threaded engine
/// (`learn::LearningEngine`, `ic3::FrameEngine`) and summed by
/// `parallel::Coordinator`.
#[derive(Debug, Clone)]
pub struct Counters {
    pub counterexamples: usize,
    pub cubes_blocked: usize,
    pub sat_calls: usize,
    pub qbf_calls: usize,
    pub generalization_attempts: usize,
    pub generalization_successes: usize,
    pub frames_advanced: usize,
    pub restarts: usize,
    started: Instant,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            counterexamples: 0,
            cubes_blocked: 0,
            sat_calls: 0,
            qbf_calls: 0,
            generalization_attempts: 0,
            generalization_successes: 0,
            frames_advanced: 0,
            restarts: 0,
            started: Instant::now(),
        }
    }
}

impl Stats for Counters {
    fn counterexamples(&self) -> usize {
        self.counterexamples
    }
    fn cubes_blocked(&self) -> usize {
        self.cubes_blocked
    }
    fn sat_calls(&self) -> usize {
        self.sat_calls
    }
    fn qbf_calls(&self) -> usize {
        self.qbf_calls
    }
    fn restarts(&self) -> usize {
        self.restarts
    }
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Counters {
    pub fn log_progress(&self, phase: &str) {
        log::info!(
            "{phase}: {} counterexamples, {} cubes blocked, {} SAT calls, {} QBF calls, {} restarts, {:?} elapsed",
            self.counterexamples,
            self.cubes_blocked,
            self.sat_calls,
            self.qbf_calls,
            self.restarts,
            self.elapsed(),
        );
    }

    /// A `serde`-serializable snapshot, for `--stats-json` (SPEC_FULL's
    /// ambient "machine-readable run statistics" supplement). `Duration`
    /// itself has no stable JSON shape worth committing to, so elapsed
    /// time is flattened to seconds.
    pub fn summary(&self, phase: &str) -> StatsSummary {
        StatsSummary {
            phase: phase.to_string(),
            counterexamples: self.counterexamples,
            cubes_blocked: self.cubes_blocked,
            sat_calls: self.sat_calls,
            qbf_calls: self.qbf_calls,
            generalization_attempts: self.generalization_attempts,
            generalization_successes: self.generalization_successes,
            frames_advanced: self.frames_advanced,
            restarts: self.restarts,
            elapsed_secs: self.elapsed().as_secs_f64(),
        }
    }
}

/// JSON-serializable snapshot of [`Counters`] written by `--stats-json`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub phase: String,
    pub counterexamples: usize,
    pub cubes_blocked: usize,
    pub sat_calls: usize,
    pub qbf_calls: usize,
    pub generalization_attempts: usize,
    pub generalization_successes: usize,
    pub frames_advanced: usize,
    pub restarts: usize,
    pub elapsed_secs: f64,
}

impl StatsSummary {
    /// Writes `self` as pretty JSON to `path` (§7: "resource error" if the
    /// write fails — callers surface it as `Error::resource`).
    pub fn write_json(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let file = std::fs::File::create(path).map_err(|e| {
            crate::error::Error::resource(format!("failed to create {path:?}: {e}"))
        })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| crate::error::Error::resource(format!("failed to write {path:?}: {e}")))
    }
}

/// Mirrors `lib.rs`'s `progress()` helper: a steady-ticking spinner for
/// long-running back ends (the parallel coordinator, the IC3-style outer
/// loop).
pub fn progress_bar(label: &str) -> indicatif::ProgressBar {
    let tick = Duration::from_millis(250);
    let style = indicatif::ProgressStyle::with_template("{spinner:.cyan} {elapsed} ~ {msg}")
        .expect("static template is valid");
    let bar = indicatif::ProgressBar::new_spinner();
    bar.set_style(style);
    bar.set_message(label.to_string());
    bar.enable_steady_tick(tick);
    bar
}
