//! The default, self-contained strategy extractor: no external binary
//! required. Where §4.9 frames extraction as reading Skolem/Herbrand
//! functions off an unsatisfiability proof, this backend instead searches
//! a growing pool of combinational candidate expressions over `(i,s)` and
//! verifies each with a single SAT query — a candidate-and-verify
//! (CEGIS-style) reading of the same specification that needs no external
//! Herbrand-extraction tool. [`external::ExternalExtractor`] is the
//! from-the-spec alternative for when a real extraction pipeline is
//! configured (see DESIGN.md for why both exist).
//!
//! Soundness: a candidate tuple `f = (f_1,...,f_m)`, one combinational
//! function per controllable input, is accepted only once
//! `W(s) ∧ (c_k ↔ f_k(i,s) for all k) ∧ T(s,i,c,s′) ∧ ¬W(s′)` is UNSAT —
//! exactly Testable Property 4(c) specialized to this particular `c`.
//! Candidates for every controllable output are verified *jointly*, never
//! one at a time with the rest left unconstrained: the other controllable
//! values are the protagonist's own choices too, not an adversary's, so
//! "free" would admit a spuriously bad assignment of them and reject a
//! perfectly good partial candidate.

use super::StrategyExtractor;
use crate::aig::{negate as aig_negate, var_of as aig_var_of, AigLit, StrategyAig, FALSE, TRUE};
use crate::cnf::{Clause, Cnf, Literal};
use crate::error::{Error, Result};
use crate::sat::{InProcessSatSolver, SatSolver};
use crate::spec::Model;
use crate::vars::{VarId, VarKind, VarStore};
use std::collections::HashMap;

/// One candidate expression over the leaves (controllable inputs never
/// appear here — only state and uncontrollable-input literals, per §4.9:
/// "inputs are a subset of the specification's `(i,s)` AIG literals").
#[derive(Debug, Clone)]
enum Expr {
    Const(bool),
    Leaf(AigLit),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Builds the candidate pool in increasing-complexity order: constants,
/// then leaves, then depth-1 pairwise AND/OR, then depth-2 combinations of
/// a leaf with a depth-1 candidate. `cap` bounds the pool so this crate
/// never tries to materialize every depth-2 combination for specs with
/// many latches/inputs (§4.4's expansion budget is the model for "bound
/// growth and document the cap" rather than let it blow up silently).
fn candidate_pool(leaves: &[AigLit], max_depth: usize, cap: usize) -> Vec<Expr> {
    let mut pool = vec![Expr::Const(false), Expr::Const(true)];
    for &lit in leaves {
        pool.push(Expr::Leaf(lit));
    }
    let depth0_end = pool.len();
    if max_depth >= 1 {
        'outer: for i in 0..depth0_end {
            for j in (i + 1)..depth0_end {
                if pool.len() >= cap {
                    break 'outer;
                }
                pool.push(Expr::And(Box::new(pool[i].clone()), Box::new(pool[j].clone())));
                pool.push(Expr::Or(Box::new(pool[i].clone()), Box::new(pool[j].clone())));
            }
        }
    }
    let depth1_end = pool.len();
    if max_depth >= 2 {
        'outer2: for i in 0..depth0_end {
            for j in depth0_end..depth1_end {
                if pool.len() >= cap {
                    break 'outer2;
                }
                pool.push(Expr::And(Box::new(pool[i].clone()), Box::new(pool[j].clone())));
                pool.push(Expr::Or(Box::new(pool[i].clone()), Box::new(pool[j].clone())));
            }
        }
    }
    pool
}

/// Lowers `expr` to a propositional literal, extending `cnf` with the
/// Tseitin clauses for any `And`/`Or` node encountered (leaves and
/// constants need none). `leaf_var` maps an AIG variable index to the
/// propositional `VarId` the specification model already allocated for
/// it; `consts` are literals pinned true/false once per verification pass.
fn lower(
    expr: &Expr,
    leaf_var: &HashMap<u32, VarId>,
    consts: (Literal, Literal),
    vars: &mut VarStore,
    cnf: &mut Cnf,
) -> Literal {
    match expr {
        Expr::Const(false) => consts.0,
        Expr::Const(true) => consts.1,
        Expr::Leaf(lit) => {
            let var = leaf_var[&aig_var_of(*lit)];
            Literal::signed(var, crate::aig::is_negated(*lit))
        }
        Expr::And(a, b) => {
            let la = lower(a, leaf_var, consts, vars, cnf);
            let lb = lower(b, leaf_var, consts, vars, cnf);
            let out = vars.fresh(VarKind::Temporary);
            let out_lit = Literal::positive(out);
            cnf.add(Clause::new([out_lit.negated(), la]).expect("fresh var"));
            cnf.add(Clause::new([out_lit.negated(), lb]).expect("fresh var"));
            cnf.add(Clause::new([out_lit, la.negated(), lb.negated()]).expect("fresh var"));
            out_lit
        }
        Expr::Or(a, b) => {
            let la = lower(a, leaf_var, consts, vars, cnf);
            let lb = lower(b, leaf_var, consts, vars, cnf);
            let out = vars.fresh(VarKind::Temporary);
            let out_lit = Literal::positive(out);
            cnf.add(Clause::new([out_lit, la.negated()]).expect("fresh var"));
            cnf.add(Clause::new([out_lit, lb.negated()]).expect("fresh var"));
            cnf.add(Clause::new([out_lit.negated(), la, lb]).expect("fresh var"));
            out_lit
        }
    }
}

/// Lowers the finally accepted `expr` into the extractor's own AIG gate
/// pool, numbered from `next_var` upward (the caller seeds `next_var`
/// above the specification's own `max_var`, so these never collide with a
/// real spec literal — see [`super::mod`]'s embedding contract).
fn to_aig(
    expr: &Expr,
    next_var: &mut u32,
    ands: &mut Vec<(AigLit, AigLit, AigLit)>,
) -> AigLit {
    match expr {
        Expr::Const(false) => FALSE,
        Expr::Const(true) => TRUE,
        Expr::Leaf(lit) => *lit,
        Expr::And(a, b) => {
            let la = to_aig(a, next_var, ands);
            let lb = to_aig(b, next_var, ands);
            *next_var += 1;
            let out = *next_var * 2;
            ands.push((out, la, lb));
            out
        }
        Expr::Or(a, b) => {
            let la = aig_negate(to_aig(a, next_var, ands));
            let lb = aig_negate(to_aig(b, next_var, ands));
            *next_var += 1;
            let out = *next_var * 2;
            ands.push((out, la, lb));
            aig_negate(out)
        }
    }
}

pub struct CandidateExtractor {
    next_var: u32,
    max_depth: usize,
    pool_cap: usize,
    max_attempts: usize,
}

impl CandidateExtractor {
    /// `spec_max_var` must be the specification AIG's own `max_var`, so
    /// this extractor's internal gate numbering starts strictly above it.
    pub fn new(spec_max_var: u32) -> Self {
        Self {
            next_var: spec_max_var,
            max_depth: 2,
            pool_cap: 4096,
            max_attempts: 50_000,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

impl StrategyExtractor for CandidateExtractor {
    fn extract(&mut self, vars: &mut VarStore, model: &Model, w: &Cnf) -> Result<StrategyAig> {
        let mut leaves = Vec::new();
        let mut leaf_var = HashMap::new();
        for &v in model.uncontrollable_vars.iter().chain(model.state_vars.iter()) {
            let lit = model.aig_var_of[&v];
            leaf_var.insert(aig_var_of(lit), v);
            leaves.push(lit);
            leaves.push(aig_negate(lit));
        }

        let pool = candidate_pool(&leaves, self.max_depth, self.pool_cap);
        let m = model.controllable_vars.len();
        let mut chosen: Vec<usize> = vec![0; m];
        let mut attempts = 0usize;

        if search(0, &mut chosen, &pool, model, w, vars, &leaf_var, &mut attempts, self.max_attempts) {
            let mut ands = Vec::new();
            let mut next_var = self.next_var;
            let outputs = chosen
                .iter()
                .map(|&idx| to_aig(&pool[idx], &mut next_var, &mut ands))
                .collect();
            Ok(StrategyAig {
                ands,
                outputs,
                max_var: next_var,
            })
        } else {
            Err(Error::solver(format!(
                "strategy extraction exhausted its candidate budget ({} attempts) without finding a Skolem function for {m} controllable input(s)",
                self.max_attempts
            )))
        }
    }
}

/// Backtracking joint search over `chosen[0..m]`, one pool index per
/// controllable input. Verifies only once every slot is assigned — see
/// this module's doc comment for why partial/independent verification
/// would be unsound.
#[allow(clippy::too_many_arguments)]
fn search(
    idx: usize,
    chosen: &mut [usize],
    pool: &[Expr],
    model: &Model,
    w: &Cnf,
    vars: &mut VarStore,
    leaf_var: &HashMap<u32, VarId>,
    attempts: &mut usize,
    max_attempts: usize,
) -> bool {
    if idx == chosen.len() {
        return verify(chosen, pool, model, w, vars, leaf_var, attempts, max_attempts);
    }
    for candidate in 0..pool.len() {
        if *attempts >= max_attempts {
            return false;
        }
        chosen[idx] = candidate;
        if search(idx + 1, chosen, pool, model, w, vars, leaf_var, attempts, max_attempts) {
            return true;
        }
    }
    false
}

#[allow(clippy::too_many_arguments)]
fn verify(
    chosen: &[usize],
    pool: &[Expr],
    model: &Model,
    w: &Cnf,
    vars: &mut VarStore,
    leaf_var: &HashMap<u32, VarId>,
    attempts: &mut usize,
    max_attempts: usize,
) -> bool {
    if *attempts >= max_attempts {
        return false;
    }
    *attempts += 1;

    vars.push();
    let mut cnf = w.clone();
    cnf.extend(model.trans.clone());
    cnf.add(Clause::unit(Literal::positive(model.activation)));
    let w_next = w.rename(|v| model.present_to_next(v));
    cnf.extend(w_next.negate(vars));

    let true_var = vars.fresh(VarKind::Temporary);
    let consts = (Literal::negative(true_var), Literal::positive(true_var));
    cnf.add(Clause::unit(consts.1));

    for (&c_var, &pool_idx) in model.controllable_vars.iter().zip(chosen.iter()) {
        let f = lower(&pool[pool_idx], leaf_var, consts, vars, &mut cnf);
        let c_lit = Literal::positive(c_var);
        cnf.add(Clause::new([c_lit.negated(), f]).expect("fresh biconditional"));
        cnf.add(Clause::new([c_lit, f.negated()]).expect("fresh biconditional"));
    }

    let mut solver = InProcessSatSolver::new(false);
    let unsat = !solver.solve(&cnf);
    vars.pop();
    unsat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::{Aig, Latch};

    /// Scenario 1 of §8: one latch, no inputs, error = s, s' = 0, one
    /// unused controllable input. The constant candidate `c := 0` (the
    /// first entry in the pool) must be found immediately.
    #[test]
    fn extracts_constant_strategy_for_unused_controllable() {
        let mut aig = Aig {
            max_var: 2,
            ..Aig::new()
        };
        aig.inputs.push(4);
        aig.input_names.insert(4, "controllable_c".to_string());
        aig.latches.push(Latch { out: 2, next: 0 });
        aig.outputs.push(2);

        let mut vars = VarStore::new();
        let model = Model::build(&aig, &mut vars).unwrap();
        // W = Safe is already the correct winning region for this scenario.
        let w = model.safe.clone();
        let mut extractor = CandidateExtractor::new(aig.max_var);
        let strategy = extractor.extract(&mut vars, &model, &w).unwrap();
        assert_eq!(strategy.outputs.len(), 1);
    }

    /// Scenario 2 of §8: `s' = i ∧ ¬c`, error = s, expected realization
    /// `c = 1` (so `s'` is always 0 regardless of `i`).
    #[test]
    fn extracts_identity_or_constant_strategy_with_one_uncontrollable() {
        let mut aig = Aig {
            max_var: 4,
            ..Aig::new()
        };
        aig.inputs.push(2); // uncontrollable i, var 1
        aig.inputs.push(4); // controllable c, var 2
        aig.input_names.insert(4, "controllable_c".to_string());
        // gate: i_and_notc = i ∧ ¬c, at var 3 (literal 6)
        aig.ands.push(crate::aig::AndGate { out: 6, a: 2, b: 5 });
        aig.latches.push(Latch { out: 8, next: 6 }); // s' = i ∧ ¬c, var 4
        aig.outputs.push(8);

        let mut vars = VarStore::new();
        let model = Model::build(&aig, &mut vars).unwrap();
        let w = model.safe.clone();
        let mut extractor = CandidateExtractor::new(aig.max_var);
        let strategy = extractor.extract(&mut vars, &model, &w).unwrap();
        assert_eq!(strategy.outputs.len(), 1);
    }
}
