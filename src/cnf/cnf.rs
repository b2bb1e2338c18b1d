use super::clause::{Clause, Cube};
use super::tseitin;
use crate::vars::{VarId, VarStore};
use fixedbitset::FixedBitSet;
use std::collections::HashMap;

/// An ordered list of clauses (§3). `add_simplified` is the sole path used
/// during fixpoint iteration: it preserves the set's logical content while
/// bounding growth, dropping clauses subsumed by the newcomer and rejecting
/// a newcomer subsumed by something already present.
#[derive(Debug, Clone, Default)]
pub struct Cnf {
    clauses: Vec<Clause>,
    /// clause length -> indices into `clauses`, maintained incrementally so
    /// `add_simplified` only has to compare against same-or-shorter clauses
    /// (a longer clause can never subsume a shorter one).
    by_len: HashMap<usize, Vec<usize>>,
}

impl Cnf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn add(&mut self, clause: Clause) {
        let len = clause.len();
        self.by_len.entry(len).or_default().push(self.clauses.len());
        self.clauses.push(clause);
    }

    pub fn extend(&mut self, other: Cnf) {
        for clause in other.clauses {
            self.add(clause);
        }
    }

    /// Adds `clause`, first removing every stored clause it subsumes, and
    /// skipping the add entirely if an existing (necessarily
    /// same-length-or-shorter) clause already subsumes it. O(existing
    /// clauses) per call, using the length buckets to skip clauses that are
    /// too long to subsume or be subsumed by `clause`.
    pub fn add_simplified(&mut self, clause: Clause) {
        let new_len = clause.len();

        for len in 1..=new_len {
            if let Some(indices) = self.by_len.get(&len) {
                for &idx in indices {
                    if self.clauses[idx].subsumes(&clause) {
                        return; // clause is redundant, drop it
                    }
                }
            }
        }

        let mut removed = FixedBitSet::with_capacity(self.clauses.len());
        let mut any_removed = false;
        for len in new_len..=self.max_len() {
            if let Some(indices) = self.by_len.get(&len) {
                for &idx in indices {
                    if !removed[idx] && clause.subsumes(&self.clauses[idx]) {
                        removed.insert(idx);
                        any_removed = true;
                    }
                }
            }
        }

        if any_removed {
            self.rebuild_dropping(removed);
        }
        self.add(clause);
    }

    fn max_len(&self) -> usize {
        self.by_len.keys().copied().max().unwrap_or(0)
    }

    fn rebuild_dropping(&mut self, removed: FixedBitSet) {
        let kept = std::mem::take(&mut self.clauses)
            .into_iter()
            .enumerate()
            .filter_map(|(idx, c)| if removed[idx] { None } else { Some(c) })
            .collect::<Vec<_>>();
        self.clauses.clear();
        self.by_len.clear();
        for clause in kept {
            self.add(clause);
        }
    }

    /// One unit clause per literal of `cube`.
    pub fn add_cube_as_clauses(&mut self, cube: &Cube) {
        for clause in cube.as_unit_clauses() {
            self.add(clause);
        }
    }

    /// A single clause, the negation of `cube` — "this exact cube is
    /// forbidden".
    pub fn add_neg_cube(&mut self, cube: &Cube) {
        self.add(Clause::negate_cube(cube));
    }

    /// Syntactic satisfaction check: every clause has at least one literal
    /// satisfied by `cube`. This is cheaper than a SAT call and is used as
    /// a fast pre-check (e.g. `s ∈ ¬W` in the IC3-style engine, §4.7),
    /// never as a substitute for an actual solve when the answer is "no".
    pub fn contains_sat_assignment(&self, cube: &Cube) -> bool {
        self.clauses
            .iter()
            .all(|c| c.literals().iter().any(|&l| cube.contains(l)))
    }

    pub fn remove_duplicates(&mut self) {
        let mut seen = std::collections::HashSet::new();
        let kept = std::mem::take(&mut self.clauses)
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .collect::<Vec<_>>();
        self.clauses.clear();
        self.by_len.clear();
        for clause in kept {
            self.add(clause);
        }
    }

    /// Equisatisfiable `¬self`, introducing one fresh Tseitin temporary per
    /// clause (§4.1).
    pub fn negate(&self, vars: &mut VarStore) -> Cnf {
        tseitin::negate(self, vars)
    }

    /// Pointwise literal remapping.
    #[must_use]
    pub fn rename(&self, map: impl Fn(VarId) -> VarId) -> Cnf {
        let mut out = Cnf::new();
        for clause in &self.clauses {
            out.add(clause.renamed(&map));
        }
        out
    }

    /// Swaps every present-state variable for its next-state counterpart
    /// and vice versa, via `pair`. `pair` must be an involution over the
    /// variables this CNF actually mentions — `swap_present_to_next ∘
    /// swap_present_to_next = identity` (Testable Property 8) follows
    /// directly from `pair` being one.
    #[must_use]
    pub fn swap_present_to_next(&self, pair: impl Fn(VarId) -> VarId) -> Cnf {
        self.rename(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnf::literal::Literal;

    fn lit(v: VarId, neg: bool) -> Literal {
        Literal::signed(v, neg)
    }

    #[test]
    fn add_simplified_drops_subsumed_newcomer() {
        let mut cnf = Cnf::new();
        cnf.add_simplified(Clause::new([lit(1, false)]).unwrap());
        cnf.add_simplified(Clause::new([lit(1, false), lit(2, true)]).unwrap());
        assert_eq!(cnf.len(), 1);
    }

    #[test]
    fn add_simplified_removes_subsumed_existing() {
        let mut cnf = Cnf::new();
        cnf.add_simplified(Clause::new([lit(1, false), lit(2, true)]).unwrap());
        cnf.add_simplified(Clause::new([lit(1, false)]).unwrap());
        assert_eq!(cnf.len(), 1);
        assert_eq!(cnf.clauses()[0].len(), 1);
    }

    #[test]
    fn add_simplified_is_idempotent() {
        let mut cnf = Cnf::new();
        let clause = Clause::new([lit(5, false), lit(6, true)]).unwrap();
        cnf.add_simplified(clause.clone());
        cnf.add_simplified(clause);
        assert_eq!(cnf.len(), 1);
    }

    #[test]
    fn swap_present_to_next_is_involutive() {
        let mut cnf = Cnf::new();
        cnf.add(Clause::new([lit(1, false), lit(2, true)]).unwrap());
        let pair = |v: VarId| if v == 1 { 2 } else { 1 };
        let swapped = cnf.swap_present_to_next(pair);
        let back = swapped.swap_present_to_next(pair);
        assert_eq!(back.clauses(), cnf.clauses());
    }

    #[test]
    fn contains_sat_assignment_checks_every_clause() {
        let mut cnf = Cnf::new();
        cnf.add(Clause::new([lit(1, false), lit(2, false)]).unwrap());
        cnf.add(Clause::new([lit(3, true)]).unwrap());
        let satisfies = Cube::new([lit(1, false), lit(3, true)]).unwrap();
        assert!(cnf.contains_sat_assignment(&satisfies));
        let fails = Cube::new([lit(1, true), lit(2, true), lit(3, true)]).unwrap();
        assert!(!cnf.contains_sat_assignment(&fails));
    }
}
