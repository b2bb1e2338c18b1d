use super::{Prefix, QbfSolver, QbfVerdict, Quantifier};
use crate::cnf::{Cnf, Cube};
use crate::error::Result;
use crate::expand::{self, DEFAULT_CLAUSE_BUDGET};
use crate::sat::SatSolver;
use crate::vars::{VarId, VarStore};
use std::collections::HashSet;

/// The `qbf_reduction` back end of §6: discharges every QBF query by
/// eliminating the (single) universal block with [`crate::expand`] and
/// handing the resulting SAT formula to an in-process or external SAT
/// backend. Every query this crate issues has the shape `∃X. ∀Y. ∃Z. F`
/// (outermost existentials, one controllable-input universal block,
/// innermost existentials) — §4.3's quantifier prefix is general, but
/// §4.5-§4.9 never build anything deeper than this single alternation, so
/// that is what this reduction assumes; a prefix with more than one
/// universal block is a programming error here (debug-asserted, §7
/// Logic/assertion error).
pub struct ReductionQbfSolver<S: SatSolver> {
    sat: S,
    budget: usize,
    current_prefix: Prefix,
    outer_vars: Vec<VarId>,
}

impl<S: SatSolver> ReductionQbfSolver<S> {
    pub fn new(sat: S, budget: usize) -> Self {
        Self {
            sat,
            budget,
            current_prefix: Prefix::new(),
            outer_vars: Vec::new(),
        }
    }

    fn forall_vars(prefix: &Prefix, vars: &VarStore) -> Vec<VarId> {
        let forall_blocks: Vec<_> = prefix
            .0
            .iter()
            .filter(|b| b.quantifier == Quantifier::Forall)
            .collect();
        debug_assert!(
            forall_blocks.len() <= 1,
            "qbf_reduction only supports a single universal block"
        );
        forall_blocks
            .first()
            .map(|b| {
                b.kinds
                    .iter()
                    .flat_map(|&k| vars.vars_of(k).iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn outer_exists_vars(prefix: &Prefix, vars: &VarStore) -> Vec<VarId> {
        let mut out = Vec::new();
        for block in &prefix.0 {
            if block.quantifier == Quantifier::Forall {
                break;
            }
            out.extend(block.kinds.iter().flat_map(|&k| vars.vars_of(k).iter().copied()));
        }
        out
    }

    /// Reduces `cnf` under `prefix` to an equisatisfiable CNF over the
    /// matrix's existential variables only, by universally expanding the
    /// forall block. Returns the resource error of §7 on budget overflow
    /// rather than swallowing it, so callers that want the "fall back to
    /// the non-expanded path" behavior can catch it themselves.
    pub fn try_reduce(&self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> Result<Cnf> {
        let y = Self::forall_vars(prefix, vars);
        if y.is_empty() {
            return Ok(cnf.clone());
        }
        let outer: HashSet<VarId> = Self::outer_exists_vars(prefix, vars).into_iter().collect();
        let y_set: HashSet<VarId> = y.iter().copied().collect();
        let z: Vec<VarId> = cnf
            .clauses()
            .iter()
            .flat_map(|c| c.vars())
            .filter(|v| !outer.contains(v) && !y_set.contains(v))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        expand::expand(vars, cnf, &y, &z, self.budget)
    }

    pub fn try_is_sat(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> Result<bool> {
        let reduced = self.try_reduce(vars, prefix, cnf)?;
        Ok(self.sat.solve(&reduced))
    }

    pub fn try_is_sat_model(
        &mut self,
        vars: &mut VarStore,
        prefix: &Prefix,
        cnf: &Cnf,
    ) -> Result<Option<Cube>> {
        let reduced = self.try_reduce(vars, prefix, cnf)?;
        let outer = Self::outer_exists_vars(prefix, vars);
        Ok(self.sat.solve_model(&reduced, &outer))
    }
}

impl<S: SatSolver> QbfSolver for ReductionQbfSolver<S> {
    fn is_sat(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> bool {
        self.try_is_sat(vars, prefix, cnf)
            .unwrap_or_else(|e| panic!("qbf_reduction: {e}"))
    }

    fn is_sat_model(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> Option<Cube> {
        self.try_is_sat_model(vars, prefix, cnf)
            .unwrap_or_else(|e| panic!("qbf_reduction: {e}"))
    }

    fn begin_inc(&mut self, prefix: &Prefix) {
        self.current_prefix = prefix.clone();
        self.outer_vars.clear();
    }

    fn inc_add_cnf(&mut self, _cnf: &Cnf) {
        panic!(
            "ReductionQbfSolver has no native incremental mode; callers needing incremental \
             QBF should call try_is_sat/try_is_sat_model per query instead (see DESIGN.md)"
        );
    }

    fn inc_add_clause(&mut self, _clause: crate::cnf::Clause) {
        panic!("ReductionQbfSolver has no native incremental mode");
    }

    fn inc_sat_assumptions(&mut self, _cube: &Cube) -> bool {
        panic!("ReductionQbfSolver has no native incremental mode");
    }

    fn inc_sat_model_or_core(&mut self, _cube: &Cube) -> QbfVerdict {
        panic!("ReductionQbfSolver has no native incremental mode");
    }

    fn inc_push(&mut self) {
        panic!("ReductionQbfSolver has no native incremental mode");
    }

    fn inc_pop(&mut self) {
        panic!("ReductionQbfSolver has no native incremental mode");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::{Clause, Literal};
    use crate::sat::InProcessSatSolver;
    use crate::vars::VarKind;

    #[test]
    fn reduces_away_forall_block() {
        let mut vars = VarStore::new();
        let x = vars.fresh(VarKind::State);
        let y = vars.fresh(VarKind::Controllable);
        let mut cnf = Cnf::new();
        cnf.add(Clause::new([Literal::negative(y), Literal::positive(x)]).unwrap());

        let prefix = Prefix::new()
            .push(Quantifier::Exists, vec![VarKind::State])
            .push(Quantifier::Forall, vec![VarKind::Controllable]);

        let mut solver = ReductionQbfSolver::new(InProcessSatSolver::default(), DEFAULT_CLAUSE_BUDGET);
        // ∃x.∀y. (¬y ∨ x): choosing x=true satisfies the clause for every y
        assert!(solver.is_sat(&mut vars, &prefix, &cnf));

        let mut cnf_unsat = Cnf::new();
        // ∃x.∀y. (¬y ∨ ¬x) ∧ (y ∨ x): no fixed x satisfies both y=true and y=false
        cnf_unsat.add(Clause::new([Literal::negative(y), Literal::negative(x)]).unwrap());
        cnf_unsat.add(Clause::new([Literal::positive(y), Literal::positive(x)]).unwrap());
        assert!(!solver.is_sat(&mut vars, &prefix, &cnf_unsat));
    }
}
