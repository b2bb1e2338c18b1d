//! Reactive synthesis of safety-game winning strategies, emitted as
//! AIGER circuits. See `config::Options` for the CLI surface and
//! `run::execute` for the end-to-end pipeline; everything else is the
//! library the binary is built from.

pub mod aig;
pub mod cnf;
pub mod config;
pub mod error;
pub mod expand;
pub mod extract;
pub mod ic3;
pub mod learn;
pub mod parallel;
pub mod qbf;
pub mod run;
pub mod sat;
pub mod spec;
pub mod stats;
pub mod vars;
pub mod verdict;

/// Generate a uniformly random instance, mirroring the teacher's
/// `rbp_core::Arbitrary` trait. Used by the `proptest-slow`-gated
/// cross-back-end agreement tests to fuzz small AIGER instances rather
/// than hand-writing every case (§8's closing paragraph).
pub trait Arbitrary {
    fn random() -> Self;
}

/// A steady-ticking progress bar, the same shape as the teacher's
/// `lib.rs::progress()`, reused by the long-running back ends via
/// `stats::progress_bar`.
pub fn progress(n: usize) -> indicatif::ProgressBar {
    let tick = std::time::Duration::from_secs(1);
    let style = "{spinner:.cyan} {elapsed} ~ {percent:>3}% {wide_bar:.cyan}";
    let style = indicatif::ProgressStyle::with_template(style).expect("static template is valid");
    let progress = indicatif::ProgressBar::new(n as u64);
    progress.set_style(style);
    progress.enable_steady_tick(tick);
    progress
}

/// Initializes combined terminal + file logging at `level`, mirroring the
/// teacher's `lib.rs::init()` (`simplelog::CombinedLogger` over a
/// `TermLogger` and a `WriteLogger`). No `tokio`/Ctrl-C handling and no
/// database connection here: every engine in this crate is synchronous
/// (the parallel coordinator uses `std::thread::scope`, not an async
/// runtime), and there is no database in scope.
pub fn init(level: log::LevelFilter) {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let term = simplelog::TermLogger::new(
        level,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    match std::fs::create_dir_all("logs").and_then(|_| std::fs::File::create("logs/resyn.log")) {
        Ok(file) => {
            let file_logger = simplelog::WriteLogger::new(log::LevelFilter::Debug, config, file);
            simplelog::CombinedLogger::init(vec![term, file_logger]).expect("initialize logger");
        }
        Err(_) => {
            simplelog::CombinedLogger::init(vec![term]).expect("initialize logger");
        }
    }
}
