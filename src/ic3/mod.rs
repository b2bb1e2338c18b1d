//! The IC3-style frame engine of §4.7: frames `R[0..]` over-approximating
//! the antagonist's backward-reachable-to-error set, a per-level
//! "useless transition" clause set `U[..]`, and a single `goto_win` query
//! against the global winning-region over-approximation `W`.
//!
//! Simplification (documented, since nothing here can be benchmarked or
//! compiled in this exercise): every query below assembles a fresh
//! one-shot CNF and calls [`SatSolver::solve`]/`solve_model` rather than
//! maintaining persistent incremental solver state per level the way
//! §4.7 describes ("per-level pair of SAT solvers"). This is sound — the
//! formulas are identical either way — just not as fast as true
//! incrementality would be. [`crate::learn::TwoSolverSearch`] keeps real
//! incremental sessions where staleness tracking matters; IC3's
//! invariants here don't depend on solver history, so the simpler
//! one-shot form was chosen.

use crate::cnf::{Clause, Cnf, Cube, Literal};
use crate::sat::SatSolver;
use crate::spec::Model;
use crate::stats::Counters;
use crate::vars::{VarId, VarStore};
use crate::verdict::Verdict;

/// A proof obligation: "show that `state` cannot reach error within
/// `level` antagonist steps". `predecessor` is the (s,i,c) transition
/// that produced this obligation, blocked at `level + 1` if `state` turns
/// out to already be excluded from `R[level]`.
struct Obligation {
    state: Cube,
    level: usize,
    predecessor: Option<Cube>,
}

/// `true` if some clause of `cnf` is entirely composed of negations of
/// `cube`'s literals — i.e. `cube`'s assignment falsifies that clause, so
/// `cube` is excluded from whatever region `cnf` describes.
fn falsifies(cnf: &Cnf, cube: &Cube) -> bool {
    cnf.clauses()
        .iter()
        .any(|c| c.literals().iter().all(|l| cube.contains(l.negated())))
}

pub struct FrameEngine<'v, S: SatSolver> {
    vars: &'v mut VarStore,
    model: Model,
    solver: S,
    frames: Vec<Cnf>,
    useless: Vec<Cnf>,
    w: Cnf,
    pub stats: Counters,
}

impl<'v, S: SatSolver> FrameEngine<'v, S> {
    pub fn new(vars: &'v mut VarStore, model: Model, solver: S) -> Self {
        let r0 = model.safe.negate(vars);
        let w = model.safe.clone();
        Self {
            vars,
            model,
            solver,
            frames: vec![r0],
            useless: vec![Cnf::new()],
            w,
            stats: Counters::default(),
        }
    }

    fn ensure_level(&mut self, level: usize) {
        while self.frames.len() <= level {
            self.frames.push(Cnf::new());
            self.useless.push(Cnf::new());
        }
    }

    fn transition_vars(&self) -> Vec<VarId> {
        self.model
            .state_vars
            .iter()
            .chain(self.model.uncontrollable_vars.iter())
            .chain(self.model.controllable_vars.iter())
            .chain(self.model.next_state_vars.iter())
            .copied()
            .collect()
    }

    fn si_of(&self, extension: &Cube) -> Cube {
        extension.restrict(|v| {
            self.model.state_vars.contains(&v) || self.model.uncontrollable_vars.contains(&v)
        })
    }

    fn activated_trans(&self) -> Cnf {
        let mut cnf = self.model.trans.clone();
        cnf.add(Clause::unit(Literal::positive(self.model.activation)));
        cnf
    }

    /// `goto_lower[level]`: `U[level] ∧ T ∧ R[level-1]'`, with `state`
    /// already asserted. `level == 0` treats `R[-1]` as unconstrained.
    fn goto_lower_cnf(&self, level: usize, state: &Cube) -> Cnf {
        let mut cnf = if level == 0 {
            self.activated_trans()
        } else {
            let mut cnf = self.useless[level].clone();
            cnf.extend(self.activated_trans());
            cnf.extend(self.frames[level - 1].rename(|v| self.model.present_to_next(v)));
            cnf
        };
        cnf.add_cube_as_clauses(state);
        cnf
    }

    /// `gen_block_trans[level]`: `T ∧ R[level-1]'`.
    fn gen_block_trans_cnf(&self, level: usize) -> Cnf {
        let mut cnf = self.activated_trans();
        if level > 0 {
            cnf.extend(self.frames[level - 1].rename(|v| self.model.present_to_next(v)));
        }
        cnf
    }

    /// `goto_win`: `T ∧ W'`, with `state` already asserted.
    fn goto_win_cnf(&self, state: &Cube) -> Cnf {
        let mut cnf = self.activated_trans();
        cnf.extend(self.w.rename(|v| self.model.present_to_next(v)));
        cnf.add_cube_as_clauses(state);
        cnf
    }

    /// Drops literals from `cube` one at a time, keeping each drop that
    /// leaves `base_cnf ∧ cube` unsatisfiable — the "generalize the
    /// state-input pair against R[ℓ-1]'" step of §4.7.
    fn generalize_against(&mut self, base_cnf: &Cnf, cube: &Cube) -> Cube {
        let mut current = cube.clone();
        for lit in cube.literals().to_vec() {
            if !current.contains(lit) {
                continue;
            }
            let candidate = current.without(lit);
            let mut cnf = base_cnf.clone();
            cnf.add_cube_as_clauses(&candidate);
            self.stats.sat_calls += 1;
            if !self.solver.solve(&cnf) {
                current = candidate;
            }
        }
        current
    }

    fn add_useless(&mut self, upto_level: usize, transition: &Cube) {
        self.ensure_level(upto_level);
        let clause = Clause::negate_cube(transition);
        for j in 0..=upto_level {
            self.useless[j].add_simplified(clause.clone());
        }
    }

    fn block_globally(&mut self, cube: &Cube) {
        self.w.add_simplified(Clause::negate_cube(cube));
        self.stats.cubes_blocked += 1;
    }

    /// Every clause added to `R[0..=upto]` must keep `¬error` out of the
    /// blocked region (§4.7: "force the ¬error literal into the clause to
    /// keep ¬P out of the blocked set"); this adds that literal if it
    /// isn't already present.
    fn error_excluding(&self, clause: Clause) -> Clause {
        let error_lit = self.model.error_literal();
        if clause.literals().contains(&error_lit.negated()) {
            return clause;
        }
        let mut lits = clause.literals().to_vec();
        lits.push(error_lit.negated());
        Clause::new(lits).unwrap_or(clause)
    }

    fn add_to_frames_upto(&mut self, upto: usize, clause: Clause) {
        self.ensure_level(upto);
        for r in self.frames.iter_mut().take(upto + 1) {
            r.add_simplified(clause.clone());
        }
        self.stats.cubes_blocked += 1;
    }

    fn contains_initial_valuation(&self, cube: &Cube) -> bool {
        cube.literals()
            .iter()
            .filter(|l| self.model.state_vars.contains(&l.var()))
            .all(|l| l.is_negative())
    }

    /// §4.7's `recBlockCube` body for a single dequeued obligation.
    /// Returns `Some(Verdict::Unrealizable)` on the terminal failure case;
    /// otherwise pushes zero, one or two follow-up obligations onto
    /// `queue` and returns `None`.
    fn process_obligation(&mut self, ob: Obligation, queue: &mut Vec<Obligation>) -> Option<Verdict> {
        self.ensure_level(ob.level);
        if falsifies(&self.w, &ob.state) {
            return None;
        }
        if falsifies(&self.frames[ob.level], &ob.state) {
            if let Some(pred) = &ob.predecessor {
                self.add_useless(ob.level + 1, pred);
            }
            return None;
        }

        self.stats.sat_calls += 1;
        let lower = self.goto_lower_cnf(ob.level, &ob.state);
        let transition_vars = self.transition_vars();
        let Some(extension) = self.solver.solve_model(&lower, &transition_vars) else {
            // unsatisfiable: `state` itself (unminimized — a one-shot
            // solve carries no core) has no transition into R[level-1];
            // block it at every level up to `level` and propagate the
            // predecessor block one level up.
            let clause = self.error_excluding(Clause::negate_cube(&ob.state));
            self.add_to_frames_upto(ob.level, clause);
            if let Some(pred) = &ob.predecessor {
                self.add_useless(ob.level + 1, pred);
            }
            return None;
        };

        let successor = extension
            .restrict(|v| self.model.next_state_vars.contains(&v))
            .renamed(|v| self.model.next_to_present(v));
        let successor_in_w = self.w.contains_sat_assignment(&successor);

        if ob.level == 0 || !successor_in_w {
            self.stats.sat_calls += 1;
            let si = self.si_of(&extension);
            let win_cnf = self.goto_win_cnf(&si);
            let ctrl_vars = self.model.controllable_vars.clone();
            if self.solver.solve_model(&win_cnf, &ctrl_vars).is_some() {
                let gen_cnf = self.gen_block_trans_cnf(ob.level);
                let generalized = self.generalize_against(&gen_cnf, &si);
                self.add_useless(ob.level, &generalized);
                queue.push(Obligation {
                    state: ob.state,
                    level: ob.level,
                    predecessor: ob.predecessor,
                });
            } else if self.contains_initial_valuation(&ob.state) {
                return Some(Verdict::Unrealizable);
            } else {
                self.block_globally(&ob.state);
            }
        } else {
            let si = self.si_of(&extension);
            queue.push(Obligation {
                state: successor,
                level: ob.level - 1,
                predecessor: Some(si),
            });
            queue.push(Obligation {
                state: ob.state,
                level: ob.level,
                predecessor: ob.predecessor,
            });
        }
        None
    }

    /// Copies every clause of `R[i]`, `i ≤ k`, forward into `R[i+1]` when
    /// `goto_lower[i+1]` is unsatisfiable under `¬c` (§4.7's propagation
    /// pass).
    fn propagate(&mut self, k: usize) {
        for i in 0..k {
            self.ensure_level(i + 1);
            let clauses: Vec<Clause> = self.frames[i].clauses().to_vec();
            for clause in clauses {
                let neg_c = Cube::new(clause.literals().iter().map(|l| l.negated()))
                    .unwrap_or_else(Cube::empty);
                let mut cnf = self.goto_lower_cnf(i + 1, &neg_c);
                cnf.extend(self.frames[i].rename(|v| self.model.present_to_next(v)));
                self.stats.sat_calls += 1;
                if !self.solver.solve(&cnf) {
                    self.frames[i + 1].add_simplified(clause);
                }
            }
        }
    }

    /// `Some(i)` if `R[i]` and `R[i+1]` coincide as clause sets for some
    /// `i < k` — the fixpoint of §4.7's outer loop, at which point `W` is
    /// the winning region.
    fn fixpoint_level(&self, k: usize) -> Option<usize> {
        (0..k).find(|&i| {
            self.frames[i].clauses().len() == self.frames[i + 1].clauses().len()
                && self.frames[i]
                    .clauses()
                    .iter()
                    .all(|c| self.frames[i + 1].clauses().contains(c))
        })
    }

    /// §4.7's outer loop.
    pub fn run(&mut self) -> Verdict {
        self.run_until(|| false).expect("run_until with an always-false stop signal always reaches a verdict")
    }

    /// `Init(s) ∧ ¬Safe(s)` satisfiable, i.e. the reset state already
    /// violates the error property. `process_obligation`'s `falsifies(&self.w,
    /// ..)` short-circuit would otherwise discard the level-`k` obligation for
    /// this state as "already excluded from W" without ever reporting
    /// unrealizable — excluded-from-W and excluded-because-already-unsafe
    /// look identical to that check, so the initial state needs this direct
    /// test instead.
    fn initial_state_is_unsafe(&mut self) -> bool {
        let mut cnf = self.model.init.clone();
        let safe = self.model.safe.clone();
        cnf.extend(safe.negate(self.vars));
        self.stats.sat_calls += 1;
        self.solver.solve(&cnf)
    }

    /// Same loop as [`Self::run`], polled with `should_stop` before every
    /// outer iteration; see [`crate::learn::LearningEngine::run_until`]
    /// for why `crate::parallel`'s IFM-explorer worker needs this hook.
    pub fn run_until(&mut self, mut should_stop: impl FnMut() -> bool) -> Option<Verdict> {
        if self.initial_state_is_unsafe() {
            return Some(Verdict::Unrealizable);
        }
        self.vars.push();
        let mut k = 1usize;
        loop {
            if should_stop() {
                return None;
            }
            self.ensure_level(k);
            let initial_state: Cube = self
                .model
                .state_vars
                .iter()
                .map(|&s| Literal::negative(s))
                .collect();
            let mut queue = vec![Obligation {
                state: initial_state,
                level: k,
                predecessor: None,
            }];
            while let Some(idx) = queue
                .iter()
                .enumerate()
                .min_by_key(|(_, o)| o.level)
                .map(|(i, _)| i)
            {
                let ob = queue.remove(idx);
                if let Some(verdict) = self.process_obligation(ob, &mut queue) {
                    return Some(verdict);
                }
            }

            self.propagate(k);
            if self.fixpoint_level(k).is_some() {
                return Some(Verdict::Realizable(self.w.clone()));
            }
            k += 1;
            self.stats.frames_advanced += 1;
            self.stats.log_progress("ic3: frame advanced");
            self.vars.reset_to_last_push();
            self.vars.push();
        }
    }

    pub fn winning_region(&self) -> &Cnf {
        &self.w
    }

    /// Folds an externally discovered clause into `W` — the hook
    /// [`crate::parallel`] uses to broadcast explorer/generalizer/
    /// minimizer clauses into a running IFM-explorer worker (§4.8's
    /// "new W-clauses are broadcast to all workers").
    pub fn absorb_w_clause(&mut self, clause: Clause) {
        self.w.add_simplified(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::{Aig, Latch};
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
        let solver = InProcessSatSolver::new(true);
        let mut engine = FrameEngine::new(&mut vars, model, solver);
        let verdict = engine.run();
        assert!(verdict.is_realizable());
    }

    /// Scenario 5 of §8: `s' = i`, error = s, c unused. Expected:
    /// unrealizable.
    fn scenario_control_of_no_value() -> Aig {
        let mut aig = Aig {
            max_var: 3,
            ..Aig::new()
        };
        aig.inputs.push(2);
        aig.inputs.push(6);
        aig.input_names.insert(6, "controllable_c".to_string());
        aig.latches.push(Latch { out: 4, next: 2 });
        aig.outputs.push(4);
        aig
    }

    #[test]
    fn scenario_5_control_of_no_value_is_unrealizable() {
        let mut vars = VarStore::new();
        let aig = scenario_control_of_no_value();
        let model = Model::build(&aig, &mut vars).unwrap();
        let solver = InProcessSatSolver::new(true);
        let mut engine = FrameEngine::new(&mut vars, model, solver);
        let verdict = engine.run();
        assert!(!verdict.is_realizable());
    }
}
