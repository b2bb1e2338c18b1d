use super::hitting_set::enumerate_minimal_generalizations;
use super::options::{LearningOptions, Mode};
use super::two_solver::TwoSolverSearch;
use crate::cnf::{Clause, Cnf, Cube, Literal};
use crate::qbf::{Prefix, QbfSolver, Quantifier};
use crate::sat::SatSolver;
use crate::spec::Model;
use crate::stats::Counters;
use crate::vars::{VarId, VarKind, VarStore};
use crate::verdict::Verdict;
use rand::seq::SliceRandom;

/// The single-threaded learning engine of §4.5: a CEGAR loop over a
/// current guess `W`, initially `Safe`, driven by a QBF oracle (either a
/// genuine QBF solver, `back_end = learning_qbf`, or the `qbf_reduction`
/// wrapper around a SAT solver, `back_end = learning_sat`). Supports the
/// hitting-set, RG and RC mode toggles of §4.5 and, when `Mode::TWO_SOLVER`
/// is set, delegates counterexample search to [`TwoSolverSearch`] (§4.6)
/// instead of the direct QBF query.
pub struct LearningEngine<'v, Q: QbfSolver> {
    vars: &'v mut VarStore,
    model: Model,
    qbf: Q,
    w: Cnf,
    options: LearningOptions,
    pub stats: Counters,
    /// previous-time renaming map for RG/RC (§9's design note): built once
    /// over every state/input/control/temporary variable the transition
    /// relation mentions.
    previous_time: std::collections::HashMap<VarId, VarId>,
    previous_time_is_initial: VarId,
}

impl<'v, Q: QbfSolver> LearningEngine<'v, Q> {
    pub fn new(vars: &'v mut VarStore, model: Model, qbf: Q, options: LearningOptions) -> Self {
        let w = model.safe.clone();
        let mut previous_time = std::collections::HashMap::new();
        let needs_mirror = options.mode.contains(Mode::RG) || options.mode.contains(Mode::RC);
        let previous_time_is_initial = if needs_mirror {
            for &s in model
                .state_vars
                .iter()
                .chain(model.uncontrollable_vars.iter())
                .chain(model.controllable_vars.iter())
            {
                previous_time.insert(s, vars.fresh(VarKind::PreviousTime));
            }
            vars.fresh(VarKind::PreviousTime)
        } else {
            0
        };
        Self {
            vars,
            model,
            qbf,
            w,
            options,
            stats: Counters::default(),
            previous_time,
            previous_time_is_initial,
        }
    }

    fn cex_prefix(&self) -> Prefix {
        Prefix::new()
            .push(Quantifier::Exists, vec![VarKind::State, VarKind::Uncontrollable])
            .push(Quantifier::Forall, vec![VarKind::Controllable])
    }

    /// Check-CNF of §4.5: `W(s) ∧ T(s,i,c,s′) ∧ ¬W(s′)`, with the
    /// activation literal asserted so `Trans`'s guarded clauses are live.
    fn check_cnf(&mut self) -> Cnf {
        let mut cnf = self.w.clone();
        cnf.extend(self.model.trans.clone());
        cnf.add(Clause::unit(Literal::positive(self.model.activation)));
        let w_next = self.w.rename(|v| self.model.present_to_next(v));
        cnf.extend(w_next.negate(self.vars));
        if self.options.mode.contains(Mode::RC) {
            cnf.extend(self.previous_time_reachability_guard());
        }
        cnf
    }

    /// Gen-CNF of §4.5: `W(s) ∧ T(s,i,c,s′) ∧ W(s′)`, used to check that a
    /// candidate generalized cube is indeed losing — see
    /// [`Self::is_cube_still_losing`] for how the two combine into a
    /// single UNSAT query.
    fn gen_cnf(&mut self) -> Cnf {
        let mut cnf = self.w.clone();
        cnf.extend(self.model.trans.clone());
        cnf.add(Clause::unit(Literal::positive(self.model.activation)));
        let w_next = self.w.rename(|v| self.model.present_to_next(v));
        cnf.extend(w_next);
        cnf
    }

    /// RG (§4.5): strengthens the generalization query so a literal can be
    /// dropped even when the resulting cube has a W-satisfying response,
    /// provided that cube is unreachable. Witnessed by `(I(s) ∨ (W(s⁻) ∧
    /// T(s⁻,i⁻,c⁻,s) ∧ ¬s⁻))`, over the previous-time mirror of the
    /// relevant variables.
    fn reachability_witness(&mut self, current: &Cube) -> Cnf {
        let mut cnf = Cnf::new();
        let init_lit = Literal::positive(self.previous_time_is_initial);

        // disjunct 1: current_state_is_initial -> I(s)
        for clause in self.model.init.clauses() {
            let mut lits = clause.literals().to_vec();
            lits.push(init_lit.negated());
            cnf.add(Clause::new(lits).unwrap_or_else(|| {
                unreachable!("init clause extended with a fresh disabling literal is never a tautology")
            }));
        }

        // disjunct 2 (guarded by ¬current_state_is_initial): W(s⁻) ∧
        // T(s⁻,i⁻,c⁻,s) ∧ ¬(s⁻ = current), i.e. a previous-time transition
        // into `current` from a different W-state.
        let previous = |v: VarId| self.previous_time.get(&v).copied().unwrap_or(v);
        let w_prev = self.w.rename(previous);
        let trans_prev = self
            .model
            .trans
            .rename(|v| if v == self.model.activation { v } else { previous(v) });

        for clause in w_prev.clauses().iter().chain(trans_prev.clauses()) {
            let mut lits = clause.literals().to_vec();
            lits.push(init_lit);
            cnf.add(Clause::new(lits).unwrap_or_else(|| {
                unreachable!("guarded clause with a fresh enabling literal is never a tautology")
            }));
        }
        // s⁻ ≠ current: at least one state bit must differ, i.e. the
        // disjunction over all state vars of "previous bit != current bit".
        let distinct: Vec<Literal> = current
            .literals()
            .iter()
            .map(|&lit| Literal::signed(previous(lit.var()), !lit.is_negative()))
            .collect();
        if !distinct.is_empty() {
            let mut lits = distinct;
            lits.push(init_lit);
            cnf.add(Clause::new(lits).unwrap_or_else(|| {
                unreachable!("distinctness clause with a fresh enabling literal is never a tautology")
            }));
        }
        cnf
    }

    /// RC (§4.5): analogous previous-time extension threaded into
    /// counterexample search instead of generalization — "s is initial or
    /// has some predecessor in W different from itself".
    fn previous_time_reachability_guard(&mut self) -> Cnf {
        let current_state: Cube = self
            .model
            .state_vars
            .iter()
            .map(|&s| Literal::positive(s))
            .collect();
        self.reachability_witness(&current_state)
    }

    /// Checks whether `candidate`, read as a cube of state literals, is
    /// still a valid generalization: the query `∃s∈candidate. ∀i. ∃c,s′,t.
    /// Gen-CNF` must be UNSAT (no uncontrollable input has a good response
    /// for every state matching `candidate`, i.e. the cube remains
    /// entirely losing).
    fn is_cube_still_losing(&mut self, candidate: &Cube) -> bool {
        self.stats.qbf_calls += 1;
        let mut cnf = self.gen_cnf();
        cnf.add_cube_as_clauses(candidate);
        if self.options.mode.contains(Mode::RG) {
            cnf.extend(self.reachability_witness(candidate));
        }
        let prefix = Prefix::new()
            .push(Quantifier::Exists, vec![VarKind::State])
            .push(Quantifier::Forall, vec![VarKind::Uncontrollable]);
        !self.qbf.is_sat(&mut *self.vars, &prefix, &cnf)
    }

    /// §4.5 step 2: starting from `cex` (already restricted to state
    /// literals, §9), attempts to drop each literal in a shuffled order,
    /// keeping drops that preserve "still losing".
    pub(super) fn generalize(&mut self, cex: &Cube) -> Cube {
        let mut order: Vec<Literal> = cex.literals().to_vec();
        order.shuffle(&mut rand::rng());
        let mut current = cex.clone();
        for lit in order {
            if !current.contains(lit) {
                continue;
            }
            let candidate = current.without(lit);
            self.stats.generalization_attempts += 1;
            if self.is_cube_still_losing(&candidate) {
                current = candidate;
                self.stats.generalization_successes += 1;
            }
        }
        current
    }

    fn contains_initial_valuation(&self, cube: &Cube) -> bool {
        // Init is the all-zero state: `cube` is compatible with it iff
        // every literal of `cube` over a state variable is negative.
        cube.literals()
            .iter()
            .filter(|l| self.model.state_vars.contains(&l.var()))
            .all(|l| l.is_negative())
    }

    fn block(&mut self, cube: &Cube) {
        self.w.add_simplified(Clause::negate_cube(cube));
        self.stats.cubes_blocked += 1;
    }

    fn periodic_maintenance(&mut self) {
        self.w.remove_duplicates();
        self.vars.reset_to_last_push();
        self.vars.push();
        self.stats.log_progress("learn: periodic maintenance");
    }

    /// `Init(s) ∧ ¬Safe(s)` satisfiable: the reset state already violates
    /// the error property, independent of any strategy. `check_cnf` only
    /// ever searches for counterexamples among states already in the
    /// current `W`, which starts at `Safe` — an initial state excluded
    /// from `Safe` itself is therefore never in `W` to begin with, so it
    /// can never surface as a counterexample for [`Self::contains_initial_valuation`]
    /// to catch. This direct check covers that case before the main loop
    /// starts.
    fn initial_state_is_unsafe(&mut self) -> bool {
        let mut cnf = self.model.init.clone();
        let safe = self.model.safe.clone();
        cnf.extend(safe.negate(self.vars));
        self.stats.qbf_calls += 1;
        let prefix = Prefix::new();
        self.qbf.is_sat(&mut *self.vars, &prefix, &cnf)
    }

    /// §4.5's main loop.
    pub fn run(&mut self) -> Verdict {
        self.run_until(|| false).expect("run_until with an always-false stop signal always reaches a verdict")
    }

    /// Same loop as [`Self::run`], but polled with `should_stop` before
    /// every oracle call; returns `None` the moment it returns `true`
    /// without having reached a verdict. This is the hook
    /// [`crate::parallel`]'s clause-explorer worker uses to check the
    /// shared result flag between rounds rather than blocking to
    /// completion (§4.8, §5's "terminates as soon as the result flag
    /// leaves unknown").
    pub fn run_until(&mut self, mut should_stop: impl FnMut() -> bool) -> Option<Verdict> {
        if self.initial_state_is_unsafe() {
            return Some(Verdict::Unrealizable);
        }
        self.vars.push();
        let two_solver = self.options.mode.contains(Mode::TWO_SOLVER);
        let mut since_maintenance = 0usize;
        let mut searcher = if two_solver {
            Some(TwoSolverSearch::new(&self.model))
        } else {
            None
        };

        loop {
            if should_stop() {
                self.vars.pop();
                return None;
            }
            let cex = if let Some(searcher) = searcher.as_mut() {
                self.stats.sat_calls += 1;
                searcher.find_counterexample(self.vars, &self.w)
            } else {
                self.stats.qbf_calls += 1;
                let check = self.check_cnf();
                let prefix = self.cex_prefix();
                self.qbf.is_sat_model(&mut *self.vars, &prefix, &check)
            };

            let Some(model) = cex else {
                self.vars.pop();
                return Some(Verdict::Realizable(self.w.clone()));
            };
            self.stats.counterexamples += 1;
            let state_cex = model.restrict(|v| self.model.state_vars.contains(&v));
            let generalized = self.generalize_counterexample(&state_cex);

            for g in &generalized {
                if self.contains_initial_valuation(g) {
                    self.vars.pop();
                    return Some(Verdict::Unrealizable);
                }
            }
            for g in &generalized {
                self.block(g);
            }
            if let Some(searcher) = searcher.as_mut() {
                searcher.mark_stale();
            }

            since_maintenance += generalized.len();
            if since_maintenance >= self.options.maintenance_interval {
                self.periodic_maintenance();
                since_maintenance = 0;
            }
        }
    }

    pub(super) fn is_state_losing(&mut self, cube: &Cube) -> bool {
        self.is_cube_still_losing(cube)
    }

    /// Either the single shuffled-drop generalization of `cex`, or, under
    /// `Mode::HITTING_SET`, every minimal generalization found by the
    /// hitting-set tree (§4.5, §9). Exposed so [`crate::parallel`]'s
    /// counterexample-generalizer worker can reuse this step without
    /// running the whole CEGAR loop itself.
    pub fn generalize_counterexample(&mut self, cex: &Cube) -> Vec<Cube> {
        if self.options.mode.contains(Mode::HITTING_SET) {
            enumerate_minimal_generalizations(self, cex)
        } else {
            vec![self.generalize(cex)]
        }
    }

    pub fn contains_initial(&self, cube: &Cube) -> bool {
        self.contains_initial_valuation(cube)
    }

    pub fn block_cube(&mut self, cube: &Cube) {
        self.block(cube);
    }

    /// Replaces the current guess `W` outright — the hook
    /// [`crate::parallel`] uses to seed a worker's local engine from the
    /// shared winning-region snapshot before a round, and to fold a
    /// worker's own discoveries back out via [`Self::winning_region`]
    /// afterward.
    pub fn set_w(&mut self, w: Cnf) {
        self.w = w;
    }

    pub fn winning_region(&self) -> &Cnf {
        &self.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::{Aig, Latch};
    use crate::qbf::ReductionQbfSolver;
    use crate::sat::InProcessSatSolver;

    /// Scenario 1 of §8: one latch, no inputs, error = s, s' = 0, one
    /// unused controllable input. Expected: realizable.
    fn scenario_1() -> Aig {
        let mut aig = Aig {
            max_var: 2,
            ..Aig::new()
        };
        aig.inputs.push(4);
        aig.input_names.insert(4, "controllable_c".to_string());
        aig.latches.push(Latch { out: 2, next: 0 });
        aig.outputs.push(2);
        aig
    }

    #[test]
    fn scenario_1_is_realizable() {
        let mut vars = VarStore::new();
        let aig = scenario_1();
        let model = Model::build(&aig, &mut vars).unwrap();
        let qbf = ReductionQbfSolver::new(InProcessSatSolver::new(true), crate::expand::DEFAULT_CLAUSE_BUDGET);
        let mut engine = LearningEngine::new(&mut vars, model, qbf, LearningOptions::default());
        let verdict = engine.run();
        assert!(verdict.is_realizable());
    }

    /// Scenario 5 of §8: `s' = i`, error = `s`, `c` unused. Expected:
    /// unrealizable.
    fn scenario_control_of_no_value() -> Aig {
        let mut aig = Aig {
            max_var: 3,
            ..Aig::new()
        };
        aig.inputs.push(2); // uncontrollable i
        aig.inputs.push(6); // controllable c, unused
        aig.input_names.insert(6, "controllable_c".to_string());
        aig.latches.push(Latch { out: 4, next: 2 }); // s' = i
        aig.outputs.push(4); // error = s
        aig
    }

    #[test]
    fn scenario_5_control_of_no_value_is_unrealizable() {
        let mut vars = VarStore::new();
        let aig = scenario_control_of_no_value();
        let model = Model::build(&aig, &mut vars).unwrap();
        let qbf = ReductionQbfSolver::new(InProcessSatSolver::new(true), crate::expand::DEFAULT_CLAUSE_BUDGET);
        let mut engine = LearningEngine::new(&mut vars, model, qbf, LearningOptions::default());
        let verdict = engine.run();
        assert!(!verdict.is_realizable());
    }
}
