use super::literal::Literal;
use crate::vars::VarId;
use std::collections::BTreeMap;

/// Deduplicates `lits`, keyed by variable. Returns `None` if the same
/// variable occurs with both polarities — for a clause that means "always
/// true, drop it"; for a cube it means "unsatisfiable, drop it". Either way
/// the caller decides what `None` means for its own container.
fn normalize(lits: impl IntoIterator<Item = Literal>) -> Option<Vec<Literal>> {
    let mut by_var: BTreeMap<VarId, bool> = BTreeMap::new();
    for lit in lits {
        match by_var.get(&lit.var()) {
            None => {
                by_var.insert(lit.var(), lit.is_negative());
            }
            Some(&neg) if neg == lit.is_negative() => {}
            Some(_) => return None,
        }
    }
    Some(
        by_var
            .into_iter()
            .map(|(v, neg)| Literal::signed(v, neg))
            .collect(),
    )
}

/// A clause: a set of literals read disjunctively. No literal appears
/// twice with the same sign; no literal appears in both polarities (§3) —
/// such an input is a tautology and [`Clause::new`] rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause(Vec<Literal>);

impl Clause {
    /// Returns `None` if `lits` is a tautology.
    pub fn new(lits: impl IntoIterator<Item = Literal>) -> Option<Self> {
        normalize(lits).map(Clause)
    }

    /// A unit clause.
    pub fn unit(lit: Literal) -> Self {
        Clause(vec![lit])
    }

    pub fn literals(&self) -> &[Literal] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.0.iter().map(|l| l.var())
    }

    /// `self` subsumes `other`: every literal of `self` also appears in
    /// `other`, so `other` is implied by `self` and can be dropped once
    /// `self` is present.
    pub fn subsumes(&self, other: &Clause) -> bool {
        self.0.iter().all(|l| other.0.contains(l))
    }

    /// Returns the clause that is the negation of `cube`, read as a cube
    /// (i.e. "block this state"): flips every literal's polarity. Used by
    /// `add_neg_cube` and by blocking steps throughout the engines.
    pub fn negate_cube(cube: &Cube) -> Self {
        Clause(cube.0.iter().map(|l| l.negated()).collect())
    }

    /// Pointwise literal remapping, used by `rename`/`swap_present_to_next`.
    pub fn renamed(&self, map: impl Fn(VarId) -> VarId) -> Self {
        Clause(
            self.0
                .iter()
                .map(|l| Literal::signed(map(l.var()), l.is_negative()))
                .collect(),
        )
    }
}

/// A cube: a set of literals read conjunctively. Same literal-set
/// invariants as [`Clause`], but `None` here means the conjunction is
/// self-contradictory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Cube(Vec<Literal>);

impl Cube {
    pub fn new(lits: impl IntoIterator<Item = Literal>) -> Option<Self> {
        normalize(lits).map(Cube)
    }

    pub fn empty() -> Self {
        Cube(Vec::new())
    }

    pub fn literals(&self) -> &[Literal] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, lit: Literal) -> bool {
        self.0.contains(&lit)
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.0.iter().map(|l| l.var())
    }

    /// Every clause read as a set of unit clauses: `add_cube_as_clauses`.
    pub fn as_unit_clauses(&self) -> Vec<Clause> {
        self.0.iter().map(|&l| Clause::unit(l)).collect()
    }

    /// A cube with `lit` removed, used while generalizing (§4.5 step 2).
    #[must_use]
    pub fn without(&self, lit: Literal) -> Cube {
        Cube(self.0.iter().copied().filter(|&l| l != lit).collect())
    }

    /// A cube restricted to literals whose variable satisfies `keep`.
    /// Counterexample restriction to state variables (§9) is the
    /// motivating use.
    #[must_use]
    pub fn restrict(&self, keep: impl Fn(VarId) -> bool) -> Cube {
        Cube(self.0.iter().copied().filter(|l| keep(l.var())).collect())
    }

    #[must_use]
    pub fn renamed(&self, map: impl Fn(VarId) -> VarId) -> Self {
        Cube(
            self.0
                .iter()
                .map(|l| Literal::signed(map(l.var()), l.is_negative()))
                .collect(),
        )
    }

    /// `true` if `self` is a subset of `other` as a set of literals — used
    /// by the hitting-set tree to recognize when a previously computed
    /// minimal generalization already avoids a forbidden literal set.
    pub fn is_subset_of(&self, other: &Cube) -> bool {
        self.0.iter().all(|l| other.0.contains(l))
    }
}

impl FromIterator<Literal> for Cube {
    fn from_iter<T: IntoIterator<Item = Literal>>(iter: T) -> Self {
        Cube::new(iter).expect("contradictory cube constructed from trusted source")
    }
}

impl IntoIterator for Cube {
    type Item = Literal;
    type IntoIter = std::vec::IntoIter<Literal>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: VarId, neg: bool) -> Literal {
        Literal::signed(v, neg)
    }

    #[test]
    fn tautological_clause_is_rejected() {
        assert!(Clause::new([lit(1, false), lit(1, true)]).is_none());
    }

    #[test]
    fn duplicate_literal_is_deduplicated() {
        let c = Clause::new([lit(1, false), lit(1, false), lit(2, true)]).unwrap();
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn subsumption_is_literal_subset() {
        let a = Clause::new([lit(1, false)]).unwrap();
        let b = Clause::new([lit(1, false), lit(2, true)]).unwrap();
        assert!(a.subsumes(&b));
        assert!(!b.subsumes(&a));
    }

    #[test]
    fn negate_cube_flips_every_literal() {
        let cube = Cube::new([lit(1, false), lit(2, true)]).unwrap();
        let clause = Clause::negate_cube(&cube);
        assert!(clause.literals().contains(&lit(1, true)));
        assert!(clause.literals().contains(&lit(2, false)));
    }

    #[test]
    fn contradictory_cube_is_rejected() {
        assert!(Cube::new([lit(3, false), lit(3, true)]).is_none());
    }
}
