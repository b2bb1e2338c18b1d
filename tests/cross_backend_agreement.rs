//! Random-AIG cross-back-end agreement, §8's closing paragraph: "the two
//! back ends agree on every randomly generated small instance". Gated
//! behind `proptest-slow` since fuzzing is slow relative to the literal
//! scenario tests in `end_to_end.rs`; run with
//! `cargo test --features proptest-slow`.
#![cfg(feature = "proptest-slow")]

use resyn::aig::Aig;
use resyn::ic3::FrameEngine;
use resyn::learn::{LearningEngine, LearningOptions};
use resyn::qbf::ReductionQbfSolver;
use resyn::sat::InProcessSatSolver;
use resyn::spec::Model;
use resyn::vars::VarStore;
use resyn::Arbitrary;

const ROUNDS: usize = 200;

fn learning_verdict(aig: &Aig) -> resyn::verdict::Verdict {
    let mut vars = VarStore::new();
    let model = Model::build(aig, &mut vars).unwrap();
    let qbf = ReductionQbfSolver::new(InProcessSatSolver::new(true), resyn::expand::DEFAULT_CLAUSE_BUDGET);
    let mut engine = LearningEngine::new(&mut vars, model, qbf, LearningOptions::default());
    engine.run()
}

fn ic3_verdict(aig: &Aig) -> resyn::verdict::Verdict {
    let mut vars = VarStore::new();
    let model = Model::build(aig, &mut vars).unwrap();
    let solver = InProcessSatSolver::new(true);
    let mut engine = FrameEngine::new(&mut vars, model, solver);
    engine.run()
}

/// Every random instance is small enough (at most 3 latches, 2
/// uncontrollable inputs) that both back ends terminate quickly, and both
/// compute the same greatest fixpoint, so they must agree on realizability
/// regardless of which one happens to run first.
#[test]
fn learning_and_ic3_agree_on_random_instances() {
    for round in 0..ROUNDS {
        let aig = Aig::random();
        let learning = learning_verdict(&aig);
        let ic3 = ic3_verdict(&aig);
        assert_eq!(
            learning.is_realizable(),
            ic3.is_realizable(),
            "round {round}: learning engine and frame engine disagree on {aig:?}"
        );
    }
}
