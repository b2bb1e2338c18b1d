//! The SAT backend interface of §4.2: a polymorphic solver with an
//! incremental mode (push/pop, assumption-based solving, model and
//! unsat-core extraction). Two concrete backends are provided, matching
//! §9's "one concrete implementation per backend, no shared solver state":
//! an in-process adapter over the `varisat` crate, and an out-of-process
//! adapter that shells out to an external DIMACS-speaking binary.

mod external;
mod in_process;

pub use external::ExternalSatSolver;
pub use in_process::InProcessSatSolver;

use crate::cnf::{Clause, Cnf, Cube};
use crate::vars::VarId;

/// The two states of §4.2: a solver starts `Idle` and becomes
/// `IncrementalOpen` once `begin_inc` is called. Every `inc_*` call before
/// `begin_inc` is a programming error and panics (§4.2 "Failure").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Idle,
    IncrementalOpen,
}

/// The outcome of `inc_sat_model_or_core`: either a model restricted to
/// the caller's `relevant` variables, or a core that is a subset of the
/// assumption cube.
#[derive(Debug, Clone)]
pub enum SatVerdict {
    Sat(Cube),
    Unsat(Cube),
}

/// §4.2's solver interface. Implementors own their internal state and are
/// constructed per engine; they never share a solver handle across
/// backends (§9).
pub trait SatSolver {
    /// One-shot solve, no incremental session required.
    fn solve(&mut self, cnf: &Cnf) -> bool;

    /// One-shot solve with model extraction, restricted to `relevant`.
    fn solve_model(&mut self, cnf: &Cnf, relevant: &[VarId]) -> Option<Cube>;

    /// Starts an incremental session. Variables in `keep` must survive any
    /// internal restart/rebuild the implementation performs.
    /// `randomize_models` requests that, when multiple models exist, the
    /// backend vary which one it returns (used to diversify explorers in
    /// the parallel coordinator, §4.8).
    fn begin_inc(&mut self, keep: &[VarId], randomize_models: bool);

    fn inc_add_clause(&mut self, clause: Clause);
    fn inc_add_cnf(&mut self, cnf: &Cnf);
    fn inc_add_cube(&mut self, cube: &Cube);
    /// Adds `cube`'s negation as a single clause (as opposed to
    /// `inc_add_cube`, which asserts every literal as a unit clause).
    fn inc_add_neg_cube(&mut self, cube: &Cube);

    fn inc_push(&mut self);
    fn inc_pop(&mut self);

    fn inc_sat(&mut self, assumptions: &Cube) -> bool;

    /// On SAT, a model over `relevant`, using `split` (also assumed) to
    /// pick one of possibly several models when `randomize_models` is set.
    /// On UNSAT, a core: a subset of `assumption_cube` whose conjunction
    /// with the permanent clauses is unsatisfiable, minimized to a local
    /// minimum if `minimize_cores` is enabled (§4.2).
    fn inc_sat_model_or_core(
        &mut self,
        assumption_cube: &Cube,
        split: &Cube,
        relevant: &[VarId],
    ) -> SatVerdict;

    fn state(&self) -> SolverState;
}

/// Shared by both backends: the O(|core|) local-minimization pass of
/// §4.2's `minimize_cores` option. Given a raw core and a closure that
/// checks "is `cube` (as assumptions) still unsatisfiable", drops each
/// literal in turn and keeps the drop if unsatisfiability survives.
pub(crate) fn minimize_core(core: Cube, mut still_unsat: impl FnMut(&Cube) -> bool) -> Cube {
    let mut current = core;
    let mut idx = 0;
    while idx < current.literals().len() {
        let lit = current.literals()[idx];
        let candidate = current.without(lit);
        if still_unsat(&candidate) {
            current = candidate;
        } else {
            idx += 1;
        }
    }
    current
}

/// Lets [`crate::run`] pick a concrete backend at runtime from
/// `config::SatSolverKind` without making every engine generic over a
/// trait-object type; forwards every method to the boxed value.
impl SatSolver for Box<dyn SatSolver> {
    fn solve(&mut self, cnf: &Cnf) -> bool {
        (**self).solve(cnf)
    }
    fn solve_model(&mut self, cnf: &Cnf, relevant: &[VarId]) -> Option<Cube> {
        (**self).solve_model(cnf, relevant)
    }
    fn begin_inc(&mut self, keep: &[VarId], randomize_models: bool) {
        (**self).begin_inc(keep, randomize_models)
    }
    fn inc_add_clause(&mut self, clause: Clause) {
        (**self).inc_add_clause(clause)
    }
    fn inc_add_cnf(&mut self, cnf: &Cnf) {
        (**self).inc_add_cnf(cnf)
    }
    fn inc_add_cube(&mut self, cube: &Cube) {
        (**self).inc_add_cube(cube)
    }
    fn inc_add_neg_cube(&mut self, cube: &Cube) {
        (**self).inc_add_neg_cube(cube)
    }
    fn inc_push(&mut self) {
        (**self).inc_push()
    }
    fn inc_pop(&mut self) {
        (**self).inc_pop()
    }
    fn inc_sat(&mut self, assumptions: &Cube) -> bool {
        (**self).inc_sat(assumptions)
    }
    fn inc_sat_model_or_core(&mut self, assumption_cube: &Cube, split: &Cube, relevant: &[VarId]) -> SatVerdict {
        (**self).inc_sat_model_or_core(assumption_cube, split, relevant)
    }
    fn state(&self) -> SolverState {
        (**self).state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::Literal;

    #[test]
    fn minimize_core_drops_unnecessary_literals() {
        // core {1,2,3}; only {1} is actually needed for unsat.
        let core = Cube::new([
            Literal::positive(1),
            Literal::positive(2),
            Literal::positive(3),
        ])
        .unwrap();
        let minimized = minimize_core(core, |cube| cube.contains(Literal::positive(1)) || cube.is_empty());
        assert_eq!(minimized.len(), 1);
        assert!(minimized.contains(Literal::positive(1)));
    }
}
