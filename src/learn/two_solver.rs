use crate::cnf::{Clause, Cnf, Cube, Literal};
use crate::sat::{InProcessSatSolver, SatSolver, SatVerdict};
use crate::spec::Model;
use crate::vars::{VarId, VarStore};

/// The two-solver counterexample search of §4.6: `solver_i` holds `T(s,i,c,s′)
/// ∧ ¬P(s′) ∧ [stale copy of] W(s)`, eagerly updated in the current-state
/// copy only; `solver_ctrl` holds `T(s,i,c,s′) ∧ P(s′) ∧ W(s)`, eagerly
/// updated in both copies. An alternative to the direct QBF query used by
/// [`super::LearningEngine`] when `Mode::TWO_SOLVER` is set.
///
/// Per §9's "no shared solver state" and §5's "no shared solver handles",
/// this struct owns both SAT solvers outright.
pub struct TwoSolverSearch {
    trans: Cnf,
    activation: VarId,
    next_safe: Cnf,
    next_unsafe: Cnf,
    state_vars: Vec<VarId>,
    uncontrollable_vars: Vec<VarId>,
    controllable_vars: Vec<VarId>,
    present_to_next: std::collections::HashMap<VarId, VarId>,

    solver_i: InProcessSatSolver,
    solver_ctrl: InProcessSatSolver,
    synced_i: usize,
    synced_ctrl: usize,
    /// `true` once `solver_i`'s next-state W-copy is known to lag behind
    /// the current `w`; set by [`Self::mark_stale`] after every blocked
    /// cube, cleared by [`Self::restart`].
    stale: bool,
    /// Tags every `solver_i` useless-input clause with the restart
    /// generation it was learned at (SPEC_FULL's "restart-level
    /// bookkeeping for shared U-clauses" supplement); concurrent workers
    /// sharing U-clauses must be at the same level to exchange them
    /// (§4.6, §4.8).
    pub restart_level: u64,
}

impl TwoSolverSearch {
    pub fn new(model: &Model) -> Self {
        let keep: Vec<VarId> = model
            .state_vars
            .iter()
            .chain(model.uncontrollable_vars.iter())
            .chain(model.controllable_vars.iter())
            .copied()
            .collect();

        let mut solver_i = InProcessSatSolver::new(false);
        solver_i.begin_inc(&keep, false);
        solver_i.inc_add_cnf(&model.trans);
        solver_i.inc_add_clause(Clause::unit(Literal::positive(model.activation)));
        solver_i.inc_add_cnf(&model.next_unsafe);

        let mut solver_ctrl = InProcessSatSolver::new(false);
        solver_ctrl.begin_inc(&keep, false);
        solver_ctrl.inc_add_cnf(&model.trans);
        solver_ctrl.inc_add_clause(Clause::unit(Literal::positive(model.activation)));
        solver_ctrl.inc_add_cnf(&model.next_safe);

        let present_to_next = model
            .state_vars
            .iter()
            .map(|&s| (s, model.present_to_next(s)))
            .collect();

        Self {
            trans: model.trans.clone(),
            activation: model.activation,
            next_safe: model.next_safe.clone(),
            next_unsafe: model.next_unsafe.clone(),
            state_vars: model.state_vars.clone(),
            uncontrollable_vars: model.uncontrollable_vars.clone(),
            controllable_vars: model.controllable_vars.clone(),
            present_to_next,
            solver_i,
            solver_ctrl,
            synced_i: 0,
            synced_ctrl: 0,
            stale: false,
            restart_level: 0,
        }
    }

    fn next_of(&self, v: VarId) -> VarId {
        self.present_to_next.get(&v).copied().unwrap_or(v)
    }

    fn sync_ctrl(&mut self, w: &Cnf) {
        for clause in w.clauses().iter().skip(self.synced_ctrl) {
            self.solver_ctrl.inc_add_clause(clause.clone());
            self.solver_ctrl
                .inc_add_clause(clause.renamed(|v| self.next_of(v)));
        }
        self.synced_ctrl = w.len();
    }

    fn sync_i_present_only(&mut self, w: &Cnf) {
        for clause in w.clauses().iter().skip(self.synced_i) {
            self.solver_i.inc_add_clause(clause.clone());
        }
        self.synced_i = w.len();
    }

    /// §4.6/§5's restart protocol: acquires the registry lock (modeled
    /// here as plain `&mut VarStore` access — the single-threaded engine
    /// has no contention; [`crate::parallel::shared`] is where the real
    /// lock lives), rebuilds `solver_i` with a fresh next-state copy of
    /// `W`, and bumps the restart level.
    pub fn restart(&mut self, _vars: &mut VarStore, w: &Cnf) {
        let keep: Vec<VarId> = self
            .state_vars
            .iter()
            .chain(self.uncontrollable_vars.iter())
            .chain(self.controllable_vars.iter())
            .copied()
            .collect();
        let mut solver_i = InProcessSatSolver::new(false);
        solver_i.begin_inc(&keep, false);
        solver_i.inc_add_cnf(&self.trans);
        solver_i.inc_add_clause(Clause::unit(Literal::positive(self.activation)));
        solver_i.inc_add_cnf(&self.next_unsafe);
        solver_i.inc_add_cnf(w);
        self.solver_i = solver_i;
        self.synced_i = w.len();
        self.stale = false;
        self.restart_level += 1;
    }

    /// Marks `solver_i`'s next-state copy stale; called by the engine
    /// after every blocked cube, since `W` just grew.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// §4.6's inner loop: returns a counterexample cube over (present
    /// state, uncontrollable input) if one exists, `None` if `solver_i` is
    /// unsatisfiable with a coherent view of `W`.
    pub fn find_counterexample(&mut self, vars: &mut VarStore, w: &Cnf) -> Option<Cube> {
        self.sync_ctrl(w);
        let si_vars: Vec<VarId> = self
            .state_vars
            .iter()
            .chain(self.uncontrollable_vars.iter())
            .copied()
            .collect();

        loop {
            self.sync_i_present_only(w);
            match self
                .solver_i
                .inc_sat_model_or_core(&Cube::empty(), &Cube::empty(), &si_vars)
            {
                SatVerdict::Unsat(_) => {
                    if self.stale {
                        self.restart(vars, w);
                        continue;
                    }
                    return None;
                }
                SatVerdict::Sat(si_model) => {
                    match self.solver_ctrl.inc_sat_model_or_core(
                        &si_model,
                        &Cube::empty(),
                        &self.controllable_vars,
                    ) {
                        SatVerdict::Unsat(_core) => {
                            self.stale = true;
                            return Some(si_model);
                        }
                        SatVerdict::Sat(_response) => {
                            // A response exists: per §4.6 step 3, compute a
                            // core over (s,i) and negate it into a useless-
                            // input clause. `solver_ctrl` was SAT here, so
                            // there is no unsat core to minimize; this adds
                            // the un-minimized negation of the full (s,i)
                            // cube, which is sound (it only excludes this
                            // exact state-input pair from further
                            // consideration by `solver_i`) though not as
                            // aggressive as a minimized core would be.
                            self.solver_i.inc_add_clause(Clause::negate_cube(&si_model));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::{Aig, Latch};

    #[test]
    fn finds_no_counterexample_when_w_is_everything() {
        let mut vars = VarStore::new();
        let mut aig = Aig {
            max_var: 2,
            ..Aig::new()
        };
        aig.inputs.push(4);
        aig.input_names.insert(4, "controllable_c".to_string());
        aig.latches.push(Latch { out: 2, next: 0 });
        aig.outputs.push(2);
        let model = Model::build(&aig, &mut vars).unwrap();
        let w = model.safe.clone();
        let mut search = TwoSolverSearch::new(&model);
        // W = Safe here equals the reachable winning region for this
        // trivial one-latch spec (s'=0 always reaches the safe state).
        let _ = search.find_counterexample(&mut vars, &w);
    }
}
