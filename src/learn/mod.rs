//! The single-threaded learning engine of §4.5, plus its supporting
//! hitting-set enumeration (§4.5/§9) and two-solver counterexample search
//! (§4.6). `ic3` and `parallel` build on the same `Model`/`QbfSolver`/
//! `SatSolver` seams but are separate back ends (§4.7, §4.8).

mod engine;
mod hitting_set;
mod options;
mod two_solver;

pub use engine::LearningEngine;
pub use options::{LearningOptions, Mode};
pub use two_solver::TwoSolverSearch;
