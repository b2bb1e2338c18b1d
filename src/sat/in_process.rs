use super::{minimize_core, SatSolver, SatVerdict, SolverState};
use crate::cnf::{Clause, Cnf, Cube, Literal};
use crate::vars::VarId;
use std::collections::HashSet;

fn to_varisat(lit: Literal) -> varisat::Lit {
    varisat::Lit::from_dimacs(lit.raw())
}

fn from_varisat(lit: varisat::Lit) -> Literal {
    Literal::signed(lit.var().index() as VarId + 1, !lit.is_positive())
}

fn formula_of(cnf: &Cnf) -> varisat::CnfFormula {
    let mut formula = varisat::CnfFormula::new();
    for clause in cnf.clauses() {
        let lits: Vec<varisat::Lit> = clause.literals().iter().copied().map(to_varisat).collect();
        formula.add_clause(&lits);
    }
    formula
}

/// varisat's solver has no native clause-removal, so `inc_push`/`inc_pop`
/// are implemented by recording every clause added since the matching
/// push and rebuilding a fresh `varisat::Solver` from the retained prefix
/// on pop. This costs an O(permanent clauses) replay per pop but keeps the
/// wrapper's state machine exactly as simple as §4.2 describes; `varisat`
/// is the only SAT crate in the teacher's/pack's dependency set, so no
/// incremental-native alternative was available to avoid the replay.
pub struct InProcessSatSolver {
    state: SolverState,
    minimize_cores: bool,
    permanent: Vec<varisat::Lit>, // flattened with a 0 terminator per clause, as DIMACS does
    push_marks: Vec<usize>,
    keep: HashSet<VarId>,
    randomize_models: bool,
    rng_spin: u64,
}

impl Default for InProcessSatSolver {
    fn default() -> Self {
        Self::new(false)
    }
}

impl InProcessSatSolver {
    pub fn new(minimize_cores: bool) -> Self {
        Self {
            state: SolverState::Idle,
            minimize_cores,
            permanent: Vec::new(),
            push_marks: Vec::new(),
            keep: HashSet::new(),
            randomize_models: false,
            rng_spin: 0,
        }
    }

    fn push_clause(&mut self, clause: &Clause) {
        for &lit in clause.literals() {
            self.permanent.push(to_varisat(lit));
        }
        self.permanent.push(varisat::Lit::from_dimacs(0));
    }

    fn rebuild(&self) -> varisat::Solver<'static> {
        let mut solver = varisat::Solver::new();
        for clause in self.permanent.split(|l| l.to_dimacs() == 0) {
            if !clause.is_empty() {
                solver.add_clause(clause);
            }
        }
        solver
    }

    fn solve_with_assumptions(
        &self,
        solver: &mut varisat::Solver<'_>,
        assumptions: &[varisat::Lit],
    ) -> bool {
        solver.assume(assumptions);
        solver.solve().expect("in-process SAT solve is infallible")
    }
}

impl SatSolver for InProcessSatSolver {
    fn solve(&mut self, cnf: &Cnf) -> bool {
        let mut solver = varisat::Solver::new();
        solver.add_formula(&formula_of(cnf));
        solver.solve().expect("in-process SAT solve is infallible")
    }

    fn solve_model(&mut self, cnf: &Cnf, relevant: &[VarId]) -> Option<Cube> {
        let mut solver = varisat::Solver::new();
        solver.add_formula(&formula_of(cnf));
        if !solver.solve().expect("in-process SAT solve is infallible") {
            return None;
        }
        let model = solver.model().expect("sat result always has a model");
        Some(restrict_model(&model, relevant))
    }

    fn begin_inc(&mut self, keep: &[VarId], randomize_models: bool) {
        self.state = SolverState::IncrementalOpen;
        self.keep = keep.iter().copied().collect();
        self.randomize_models = randomize_models;
        self.permanent.clear();
        self.push_marks.clear();
    }

    fn inc_add_clause(&mut self, clause: Clause) {
        assert_eq!(
            self.state,
            SolverState::IncrementalOpen,
            "inc_add_clause before begin_inc"
        );
        self.push_clause(&clause);
    }

    fn inc_add_cnf(&mut self, cnf: &Cnf) {
        assert_eq!(
            self.state,
            SolverState::IncrementalOpen,
            "inc_add_cnf before begin_inc"
        );
        for clause in cnf.clauses() {
            self.push_clause(clause);
        }
    }

    fn inc_add_cube(&mut self, cube: &Cube) {
        assert_eq!(
            self.state,
            SolverState::IncrementalOpen,
            "inc_add_cube before begin_inc"
        );
        for clause in cube.as_unit_clauses() {
            self.push_clause(&clause);
        }
    }

    fn inc_add_neg_cube(&mut self, cube: &Cube) {
        assert_eq!(
            self.state,
            SolverState::IncrementalOpen,
            "inc_add_neg_cube before begin_inc"
        );
        self.push_clause(&Clause::negate_cube(cube));
    }

    fn inc_push(&mut self) {
        assert_eq!(
            self.state,
            SolverState::IncrementalOpen,
            "inc_push before begin_inc"
        );
        self.push_marks.push(self.permanent.len());
    }

    fn inc_pop(&mut self) {
        assert_eq!(
            self.state,
            SolverState::IncrementalOpen,
            "inc_pop before begin_inc"
        );
        let mark = self.push_marks.pop().expect("inc_pop without matching inc_push");
        self.permanent.truncate(mark);
    }

    fn inc_sat(&mut self, assumptions: &Cube) -> bool {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_sat before begin_inc");
        let mut solver = self.rebuild();
        let assumps: Vec<_> = assumptions.literals().iter().copied().map(to_varisat).collect();
        self.solve_with_assumptions(&mut solver, &assumps)
    }

    fn inc_sat_model_or_core(
        &mut self,
        assumption_cube: &Cube,
        split: &Cube,
        relevant: &[VarId],
    ) -> SatVerdict {
        assert_eq!(
            self.state,
            SolverState::IncrementalOpen,
            "inc_sat_model_or_core before begin_inc"
        );
        let mut assumps: Vec<Literal> = assumption_cube.literals().to_vec();
        if self.randomize_models {
            // A cheap, deterministic-per-call pseudo-shuffle: rotate the
            // assumption order so the underlying solver's branching finds
            // a different satisfying assignment across restarts, without
            // needing an RNG dependency solely for this diversification.
            self.rng_spin = self.rng_spin.wrapping_add(1);
            let rot = (self.rng_spin as usize) % assumps.len().max(1);
            assumps.rotate_left(rot);
        }
        assumps.extend(split.literals().iter().copied());

        let mut solver = self.rebuild();
        let varisat_assumps: Vec<_> = assumps.iter().copied().map(to_varisat).collect();
        if self.solve_with_assumptions(&mut solver, &varisat_assumps) {
            let model = solver.model().expect("sat result always has a model");
            SatVerdict::Sat(restrict_model(&model, relevant))
        } else {
            let raw_core: Vec<Literal> = solver
                .failed_core()
                .expect("unsat result always has a failed core")
                .iter()
                .copied()
                .map(from_varisat)
                .collect();
            let core_in_assumption_cube: Cube = raw_core
                .into_iter()
                .filter(|l| assumption_cube.contains(*l))
                .collect();
            let core = if self.minimize_cores {
                let permanent = self.permanent.clone();
                minimize_core(core_in_assumption_cube, |candidate| {
                    let mut solver = {
                        let mut s = varisat::Solver::new();
                        for clause in permanent.split(|l| l.to_dimacs() == 0) {
                            if !clause.is_empty() {
                                s.add_clause(clause);
                            }
                        }
                        s
                    };
                    let assumps: Vec<_> =
                        candidate.literals().iter().copied().map(to_varisat).collect();
                    !solver
                        .solve_with(assumps)
                        .unwrap_or(true)
                })
            } else {
                core_in_assumption_cube
            };
            SatVerdict::Unsat(core)
        }
    }

    fn state(&self) -> SolverState {
        self.state
    }
}

fn restrict_model(model: &[varisat::Lit], relevant: &[VarId]) -> Cube {
    let relevant_set: HashSet<VarId> = relevant.iter().copied().collect();
    model
        .iter()
        .copied()
        .map(from_varisat)
        .filter(|l| relevant_set.contains(&l.var()))
        .collect()
}

/// Small extension trait so the core-minimization closure above can call
/// `solve` with fresh assumptions on an owned throwaway solver without
/// borrowing `self`.
trait SolveWith {
    fn solve_with(&mut self, assumptions: Vec<varisat::Lit>) -> Result<bool, varisat::solver::SolverError>;
}

impl SolveWith for varisat::Solver<'_> {
    fn solve_with(&mut self, assumptions: Vec<varisat::Lit>) -> Result<bool, varisat::solver::SolverError> {
        self.assume(&assumptions);
        self.solve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vars::VarStore;

    #[test]
    fn one_shot_solve_finds_satisfying_model() {
        let mut vars = VarStore::new();
        let a = vars.fresh(crate::vars::VarKind::State);
        let b = vars.fresh(crate::vars::VarKind::State);
        let mut cnf = Cnf::new();
        cnf.add(Clause::new([Literal::positive(a), Literal::positive(b)]).unwrap());
        let mut solver = InProcessSatSolver::default();
        assert!(solver.solve(&cnf));
        let model = solver.solve_model(&cnf, &[a, b]).unwrap();
        assert!(model.contains(Literal::positive(a)) || model.contains(Literal::positive(b)));
    }

    #[test]
    fn unsat_formula_is_detected() {
        let mut vars = VarStore::new();
        let a = vars.fresh(crate::vars::VarKind::State);
        let mut cnf = Cnf::new();
        cnf.add(Clause::unit(Literal::positive(a)));
        cnf.add(Clause::unit(Literal::negative(a)));
        let mut solver = InProcessSatSolver::default();
        assert!(!solver.solve(&cnf));
    }

    #[test]
    fn incremental_session_respects_push_pop() {
        let mut vars = VarStore::new();
        let a = vars.fresh(crate::vars::VarKind::State);
        let mut solver = InProcessSatSolver::new(false);
        solver.begin_inc(&[a], false);
        solver.inc_add_clause(Clause::unit(Literal::positive(a)));
        assert!(solver.inc_sat(&Cube::empty()));
        solver.inc_push();
        solver.inc_add_clause(Clause::unit(Literal::negative(a)));
        assert!(!solver.inc_sat(&Cube::empty()));
        solver.inc_pop();
        assert!(solver.inc_sat(&Cube::empty()));
    }

    #[test]
    #[should_panic]
    fn inc_before_begin_is_fatal() {
        let mut solver = InProcessSatSolver::default();
        solver.inc_push();
    }
}
