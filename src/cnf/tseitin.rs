use super::clause::Clause;
use super::cnf::Cnf;
use super::literal::Literal;
use crate::vars::{VarKind, VarStore};

/// Builds a CNF equisatisfiable to `¬cnf` (§4.1's `negate`). For each clause
/// `C_i = l_1 ∨ ... ∨ l_k` a fresh activator `t_i` is introduced with the
/// implications `t_i → ¬l_j` for every literal of `C_i`, and a final clause
/// `t_1 ∨ ... ∨ t_n` forces at least one clause of the original CNF to be
/// falsified. This is the standard one-directional Tseitin trick: it does
/// not make `t_i` equivalent to "`C_i` is false", only sufficient for it,
/// which is all that is needed to preserve (un)satisfiability.
///
/// An empty input CNF (the "true" formula) negates to the empty clause: the
/// caller gets an unsatisfiable CNF back, matching `¬⊤ = ⊥`.
pub fn negate(cnf: &Cnf, vars: &mut VarStore) -> Cnf {
    let mut out = Cnf::new();
    if cnf.clauses().is_empty() {
        out.add(Clause::new([]).unwrap_or_else(|| {
            // the empty clause is unsatisfiable by construction; `Clause::new`
            // only rejects tautologies, and the empty literal set is not one.
            unreachable!("empty literal set is never a tautology")
        }));
        return out;
    }
    let mut activators = Vec::with_capacity(cnf.clauses().len());
    for clause in cnf.clauses() {
        let t = vars.fresh(VarKind::Temporary);
        for &lit in clause.literals() {
            // t -> ¬lit, i.e. (¬t ∨ ¬lit)
            let implication = Clause::new([Literal::negative(t), lit.negated()])
                .expect("distinct variables: activator id is always fresh");
            out.add(implication);
        }
        activators.push(Literal::positive(t));
    }
    out.add(Clause::new(activators).expect("fresh activators are pairwise distinct"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::Cnf;

    #[test]
    fn negating_empty_cnf_is_unsat() {
        let mut vars = VarStore::new();
        let cnf = Cnf::new();
        let neg = negate(&cnf, &mut vars);
        assert_eq!(neg.clauses().len(), 1);
        assert!(neg.clauses()[0].is_empty());
    }

    #[test]
    fn negation_introduces_one_temporary_per_clause() {
        let mut vars = VarStore::new();
        let mut cnf = Cnf::new();
        cnf.add(Clause::new([Literal::positive(1)]).unwrap());
        cnf.add(Clause::new([Literal::positive(2), Literal::negative(3)]).unwrap());
        let before = vars.vars_of(VarKind::Temporary).len();
        negate(&cnf, &mut vars);
        let after = vars.vars_of(VarKind::Temporary).len();
        assert_eq!(after - before, 2);
    }
}
