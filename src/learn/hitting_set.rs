use super::engine::LearningEngine;
use crate::cnf::{Cube, Literal};
use crate::qbf::QbfSolver;
use std::collections::{HashSet, VecDeque};

/// The hitting-set-enumeration variant of §4.5: after the first
/// generalization, enumerates all minimal generalizations of `cex` via a
/// Reiter-style hitting-set tree. The queue holds "must-not-contain"
/// literal sets; each node either reuses a previously computed minimal
/// cube with empty intersection with the forbidden set, or re-generalizes
/// from `cex` with the forbidden literals pre-removed. Every distinct
/// minimal cube found yields a blocking clause (§9: "use a set type with
/// fast intersection check and a deque").
pub(super) fn enumerate_minimal_generalizations<Q: QbfSolver>(
    engine: &mut LearningEngine<'_, Q>,
    cex: &Cube,
) -> Vec<Cube> {
    let mut minimal_cubes: Vec<Cube> = Vec::new();
    let mut queue: VecDeque<HashSet<Literal>> = VecDeque::new();
    queue.push_back(HashSet::new());
    let mut visited: HashSet<Vec<Literal>> = HashSet::new();

    while let Some(forbidden) = queue.pop_front() {
        let mut key: Vec<Literal> = forbidden.iter().copied().collect();
        key.sort_by_key(|l| l.raw());
        if !visited.insert(key) {
            continue;
        }

        if let Some(reuse) = minimal_cubes
            .iter()
            .find(|c| c.literals().iter().all(|l| !forbidden.contains(l)))
            .cloned()
        {
            for &lit in reuse.literals() {
                let mut child = forbidden.clone();
                child.insert(lit);
                queue.push_back(child);
            }
            continue;
        }

        let restricted: Cube = cex
            .literals()
            .iter()
            .copied()
            .filter(|l| !forbidden.contains(l))
            .collect();
        if restricted.is_empty() {
            continue;
        }
        if !engine.is_state_losing(&restricted) {
            continue;
        }

        let generalized = engine.generalize(&restricted);
        for &lit in generalized.literals() {
            let mut child = forbidden.clone();
            child.insert(lit);
            queue.push_back(child);
        }
        minimal_cubes.push(generalized);
    }

    if minimal_cubes.is_empty() {
        // degenerate case: the root query itself was already minimal and
        // nothing else can be dropped without losing "still losing".
        minimal_cubes.push(engine.generalize(cex));
    }
    minimal_cubes
}
