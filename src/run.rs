//! Ties `config::Options` to the rest of the crate: reads the input AIG,
//! builds the specification model, dispatches to the selected back end,
//! and — unless `realizability_only` — extracts a strategy and embeds it
//! before writing the output AIG (§6's end-to-end pipeline). Kept
//! separate from `src/bin/resyn.rs` so the binary itself stays a thin CLI
//! shell, the way the teacher's own `src/bin/*.rs` files deferred to
//! library code.

use crate::aig::{self, Aig};
use crate::config::{BackEnd, Options, QbfSolverKind, SatSolverKind};
use crate::error::{Error, Result};
use crate::extract::{self, CandidateExtractor, StrategyExtractor};
use crate::ic3::FrameEngine;
use crate::learn::{LearningEngine, LearningOptions, Mode};
use crate::qbf::{QbfSolver, ReductionQbfSolver};
use crate::sat::{InProcessSatSolver, SatSolver};
use crate::spec::Model;
use crate::vars::VarStore;
use crate::verdict::Verdict;

fn boxed_sat_solver(options: &Options) -> Result<Box<dyn SatSolver>> {
    match options.sat_solver {
        SatSolverKind::InProcess => Ok(Box::new(InProcessSatSolver::new(options.minimize_cores))),
        SatSolverKind::External => {
            #[cfg(feature = "external-solvers")]
            {
                Ok(Box::new(crate::sat::ExternalSatSolver::new(
                    options.external_tools_dir.join("satsolver"),
                    options.tmp_dir.clone(),
                    "resyn-sat",
                    options.minimize_cores,
                )))
            }
            #[cfg(not(feature = "external-solvers"))]
            {
                Err(Error::input(
                    "sat_solver=external requires the external-solvers feature",
                ))
            }
        }
    }
}

fn boxed_qbf_solver(options: &Options, kind: QbfSolverKind) -> Result<Box<dyn QbfSolver>> {
    match kind {
        QbfSolverKind::Reduction => {
            let sat = boxed_sat_solver(options)?;
            Ok(Box::new(ReductionQbfSolver::new(sat, crate::expand::DEFAULT_CLAUSE_BUDGET)))
        }
        QbfSolverKind::External => {
            #[cfg(feature = "external-solvers")]
            {
                Ok(Box::new(crate::qbf::ExternalQbfSolver::new(
                    options.external_tools_dir.join("qbfsolver"),
                    options.tmp_dir.clone(),
                    "resyn-qbf",
                )))
            }
            #[cfg(not(feature = "external-solvers"))]
            {
                Err(Error::input(
                    "qbf_solver=external requires the external-solvers feature",
                ))
            }
        }
    }
}

/// Runs the selected winning-region engine to completion. Each of the
/// five `back_end` values of §6 is given a distinct, non-overlapping
/// meaning (recorded in DESIGN.md, §9's open question on `qbf_reduction`
/// vs. `learning_qbf`/`learning_sat`):
///
/// - `learning_qbf`: the CEGAR loop of §4.5, querying a genuine QBF
///   oracle (`qbf_solver` selects in-process reduction or external).
/// - `learning_sat`: the same CEGAR loop, but with `Mode::TWO_SOLVER`
///   forced on so counterexample search runs entirely through the
///   two-SAT-solver protocol of §4.6 (generalization still needs a QBF
///   oracle, which defaults to the in-process reduction so no external
///   QBF binary is required).
/// - `ic3_style`: the frame engine of §4.7.
/// - `parallel`: the multi-worker coordinator of §4.8.
/// - `qbf_reduction`: the CEGAR loop with the QBF oracle pinned to the
///   in-process reduction backend regardless of `qbf_solver`, for callers
///   who want `learning_qbf`'s semantics guaranteed not to shell out.
fn solve(options: &Options, aig: &Aig) -> Result<(VarStore, Model, Verdict)> {
    let mode = options.mode.to_mode();
    let learning_options = LearningOptions {
        mode,
        ..LearningOptions::default()
    };

    let result = match options.back_end {
        BackEnd::LearningQbf => {
            let mut vars = VarStore::new();
            let model = Model::build(aig, &mut vars)?;
            let qbf = boxed_qbf_solver(options, options.qbf_solver)?;
            let mut engine = LearningEngine::new(&mut vars, model.clone(), qbf, learning_options);
            let verdict = engine.run();
            engine.stats.log_progress("learning_qbf");
            report_stats_json(options, &engine.stats.summary("learning_qbf"));
            (vars, model, verdict)
        }
        BackEnd::LearningSat => {
            let mut vars = VarStore::new();
            let model = Model::build(aig, &mut vars)?;
            let qbf = boxed_qbf_solver(options, QbfSolverKind::Reduction)?;
            let two_solver_options = LearningOptions {
                mode: mode | Mode::TWO_SOLVER,
                ..learning_options
            };
            let mut engine = LearningEngine::new(&mut vars, model.clone(), qbf, two_solver_options);
            let verdict = engine.run();
            engine.stats.log_progress("learning_sat");
            report_stats_json(options, &engine.stats.summary("learning_sat"));
            (vars, model, verdict)
        }
        BackEnd::QbfReduction => {
            let mut vars = VarStore::new();
            let model = Model::build(aig, &mut vars)?;
            let qbf = boxed_qbf_solver(options, QbfSolverKind::Reduction)?;
            let mut engine = LearningEngine::new(&mut vars, model.clone(), qbf, learning_options);
            let verdict = engine.run();
            engine.stats.log_progress("qbf_reduction");
            report_stats_json(options, &engine.stats.summary("qbf_reduction"));
            (vars, model, verdict)
        }
        BackEnd::Ic3Style => {
            let mut vars = VarStore::new();
            let model = Model::build(aig, &mut vars)?;
            let sat = boxed_sat_solver(options)?;
            let mut engine = FrameEngine::new(&mut vars, model.clone(), sat);
            let verdict = engine.run();
            engine.stats.log_progress("ic3_style");
            report_stats_json(options, &engine.stats.summary("ic3_style"));
            (vars, model, verdict)
        }
        BackEnd::Parallel => {
            let coordinator = crate::parallel::Coordinator::new(aig, learning_options);
            let verdict = coordinator.run(options.threads())?;
            // the parallel path doesn't keep a single VarStore/Model pair
            // alive past the run (§4.8: each worker owns its own); rebuild
            // one here so strategy extraction has somewhere to mint fresh
            // Tseitin temporaries.
            let mut vars = VarStore::new();
            let model = Model::build(aig, &mut vars)?;
            (vars, model, verdict)
        }
    };
    Ok(result)
}

/// `--stats-json`: best-effort write, logged but not fatal to the overall
/// run if it fails — a run that already has a verdict shouldn't exit
/// non-zero purely because the sidecar statistics file couldn't be
/// written.
fn report_stats_json(options: &Options, summary: &crate::stats::StatsSummary) {
    if let Some(path) = &options.stats_json {
        if let Err(err) = summary.write_json(path) {
            log::warn!("failed to write --stats-json {path:?}: {err}");
        }
    }
}

/// Runs the whole pipeline: solve, then (unless `realizability_only`)
/// extract a strategy, embed it, optionally post-optimize, and write the
/// output AIG. Returns the process exit code of §6.
pub fn execute(options: &Options) -> Result<i32> {
    let file = std::fs::File::open(&options.aig_in)
        .map_err(|e| Error::input(format!("failed to open {:?}: {e}", options.aig_in)))?;
    let aig = aig::read(file)?;
    log::info!(
        "read AIG: {} inputs, {} latches, {} ands",
        aig.inputs.len(),
        aig.latches.len(),
        aig.ands.len()
    );

    let (mut vars, model, verdict) = solve(options, &aig)?;

    let w = match verdict {
        Verdict::Unrealizable => {
            log::info!("unrealizable");
            return Ok(Verdict::Unrealizable.exit_code());
        }
        Verdict::Realizable(w) => {
            log::info!("realizable");
            w
        }
    };

    if options.realizability_only {
        return Ok(Verdict::Realizable(w).exit_code());
    }
    if options.mode.rc && !options.allow_rc_extraction {
        return Err(Error::input(
            "strategy extraction with mode=RC requires --allow-rc-extraction (§9)",
        ));
    }

    let mut extractor: Box<dyn StrategyExtractor> = if options.optimize || options_need_external_extractor(options) {
        #[cfg(feature = "external-solvers")]
        {
            Box::new(extract::ExternalExtractor::new(
                options.external_tools_dir.join("extractor"),
                options.tmp_dir.clone(),
                "resyn-extract",
            ))
        }
        #[cfg(not(feature = "external-solvers"))]
        {
            Box::new(CandidateExtractor::new(aig.max_var))
        }
    } else {
        Box::new(CandidateExtractor::new(aig.max_var))
    };

    let strategy = extractor.extract(&mut vars, &model, &w)?;
    let input_order = extract::controllable_literal_order(&model);
    let mut output = aig::embed(&aig, &strategy, &input_order)?;

    #[cfg(feature = "external-solvers")]
    if options.optimize {
        output = extract::optimize(
            &output,
            options.external_tools_dir.join("aigopt"),
            options.tmp_dir.clone(),
            "resyn-optimize",
        )?;
    }
    #[cfg(not(feature = "external-solvers"))]
    if options.optimize {
        return Err(Error::input("--optimize requires the external-solvers feature"));
    }

    write_output(options, &output)?;
    Ok(Verdict::Realizable(w).exit_code())
}

/// §9's open question (a): nothing in this crate's `config` forces an
/// external extractor unless `--optimize` is set; this stays a hook for
/// a future `--extractor external` flag rather than an inferred default.
fn options_need_external_extractor(_options: &Options) -> bool {
    false
}

fn write_output(options: &Options, aig: &Aig) -> Result<()> {
    if options.aig_out == "stdout" {
        let stdout = std::io::stdout();
        aig::write_ascii(aig, stdout.lock())
    } else {
        let file = std::fs::File::create(&options.aig_out)
            .map_err(|e| Error::resource(format!("failed to create {:?}: {e}", options.aig_out)))?;
        aig::write_binary(aig, file)
    }
}
