//! Configuration (§6's "enumerated options the core consumes") plus the
//! ambient CLI knobs a production binary needs, parsed with `clap`
//! (derive style) the same way the teacher's `src/bin/*.rs` binaries do.

use clap::{Parser, ValueEnum};

/// §6's `back_end` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum BackEnd {
    LearningQbf,
    LearningSat,
    Ic3Style,
    Parallel,
    QbfReduction,
}

/// §6's `sat_solver` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum SatSolverKind {
    /// The in-process `varisat` adapter.
    InProcess,
    /// Shells out to a DIMACS-speaking binary under `external_tools_dir`.
    External,
}

/// §6's `qbf_solver` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum QbfSolverKind {
    /// The `qbf_reduction` universal-expansion-over-SAT adapter.
    Reduction,
    /// Shells out to a QDIMACS-speaking binary under `external_tools_dir`.
    External,
}

/// §6's `mode` is specified as "per-engine algorithmic variant"; this
/// crate models it as the bitmask toggles of [`crate::learn::Mode`]
/// (SPEC_FULL's "mode as a bitmask of orthogonal toggles" supplement),
/// exposed here as four independent CLI flags so they compose freely on
/// the command line instead of requiring one flat enum value per
/// combination.
#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct ModeFlags {
    /// Enumerate every minimal counterexample generalization via the
    /// hitting-set tree (§4.5, §9), instead of a single shuffled-drop.
    #[arg(long)]
    pub hitting_set: bool,
    /// Inductive-reachability optimization RG: permit dropping a
    /// generalization literal when the resulting cube is unreachable,
    /// even if some response stays in W (§4.5).
    #[arg(long)]
    pub rg: bool,
    /// Inductive-reachability optimization RC, threaded into
    /// counterexample search instead of generalization (§4.5). Disables
    /// strategy extraction unless `--allow-rc-extraction` is also passed
    /// (§9's open question (a), decision recorded in DESIGN.md).
    #[arg(long)]
    pub rc: bool,
    /// Use the two-solver counterexample search of §4.6 instead of a
    /// direct QBF query.
    #[arg(long)]
    pub two_solver: bool,
}

impl ModeFlags {
    pub fn to_mode(self) -> crate::learn::Mode {
        use crate::learn::Mode;
        let mut mode = Mode::NONE;
        if self.hitting_set {
            mode = mode | Mode::HITTING_SET;
        }
        if self.rg {
            mode = mode | Mode::RG;
        }
        if self.rc {
            mode = mode | Mode::RC;
        }
        if self.two_solver {
            mode = mode | Mode::TWO_SOLVER;
        }
        mode
    }
}

/// Reactive synthesis of safety-game winning strategies, emitted as
/// AIGER circuits (§6).
#[derive(Debug, Parser)]
#[command(name = "resyn", version, about)]
pub struct Options {
    /// Input AIG, binary or ASCII AIGER (§6).
    pub aig_in: std::path::PathBuf,

    /// Output AIG path, or `stdout` to write ASCII AIGER to standard
    /// output (§6).
    #[arg(long, default_value = "stdout")]
    pub aig_out: String,

    /// Engine selection (§6).
    #[arg(long, value_enum, default_value_t = BackEnd::LearningQbf)]
    pub back_end: BackEnd,

    #[command(flatten)]
    pub mode: ModeFlags,

    /// Allow strategy extraction when `--rc` is set, using the
    /// previous-time-aware extraction path instead of rejecting the
    /// combination outright (§9's open question (a), option (ii)).
    #[arg(long)]
    pub allow_rc_extraction: bool,

    #[arg(long, value_enum, default_value_t = SatSolverKind::InProcess)]
    pub sat_solver: SatSolverKind,

    #[arg(long, value_enum, default_value_t = QbfSolverKind::Reduction)]
    pub qbf_solver: QbfSolverKind,

    /// Skip strategy extraction and AIG embedding; report realizability
    /// only (§6).
    #[arg(long)]
    pub realizability_only: bool,

    /// Scratch directory for external-solver temp files (§6).
    #[arg(long, default_value = "/tmp")]
    pub tmp_dir: std::path::PathBuf,

    /// Root directory under which external solver/optimizer binaries
    /// live (§6).
    #[arg(long, default_value = ".")]
    pub external_tools_dir: std::path::PathBuf,

    /// Post-optimize the embedded AIG with an external rewriting pass
    /// (§4.9). Requires an `aigopt`-shaped binary under
    /// `external_tools_dir`.
    #[arg(long)]
    pub optimize: bool,

    /// Thread count for `--back-end parallel` (§4.8). Defaults to the
    /// number of logical CPUs, mirroring the teacher's
    /// `workers/pool.rs`'s `num_cpus::get()` usage.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Periodic progress-logging interval, in blocked cubes / frame
    /// advances (mirrors the teacher's `TRAINING_LOG_INTERVAL`).
    #[arg(long, default_value_t = 100)]
    pub stats_interval: usize,

    /// Write the run's final `stats::Counters` as JSON to this path, in
    /// addition to the usual `log::info!` progress line, mirroring the
    /// teacher's `serde`-backed persistence of trained artifacts.
    #[arg(long)]
    pub stats_json: Option<std::path::PathBuf>,

    /// Increase verbosity; repeatable (`-v`, `-vv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Locally minimize SAT/QBF unsat cores (§4.2). On by default; pass
    /// `--no-minimize-cores` to disable and trade core quality for speed.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub minimize_cores: bool,
}

impl Options {
    pub fn log_level(&self) -> log::LevelFilter {
        let base = 2i8; // Info
        let level = base + self.verbose as i8 - self.quiet as i8;
        match level.clamp(0, 4) {
            0 => log::LevelFilter::Off,
            1 => log::LevelFilter::Error,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flags_compose() {
        let flags = ModeFlags {
            hitting_set: true,
            rg: true,
            rc: false,
            two_solver: false,
        };
        let mode = flags.to_mode();
        assert!(mode.contains(crate::learn::Mode::HITTING_SET));
        assert!(mode.contains(crate::learn::Mode::RG));
        assert!(!mode.contains(crate::learn::Mode::RC));
    }
}
