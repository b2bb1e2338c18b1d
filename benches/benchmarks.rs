use resyn::aig::{self, Aig, AndGate, Latch};
use resyn::extract::{controllable_literal_order, CandidateExtractor, StrategyExtractor};
use resyn::ic3::FrameEngine;
use resyn::learn::{LearningEngine, LearningOptions};
use resyn::qbf::ReductionQbfSolver;
use resyn::sat::InProcessSatSolver;
use resyn::spec::Model;
use resyn::vars::VarStore;

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        solving_scenario_two_latch_race_learning,
        solving_scenario_two_latch_race_ic3,
        solving_shift_register_ic3,
        extracting_and_embedding_strategy,
        tseitin_negating_transition_relation,
}

/// §8 scenario 4: `a' = i`, `b' = c`, `error = a ∧ ¬b`.
fn two_latch_race() -> Aig {
    let mut aig = Aig { max_var: 5, ..Aig::new() };
    aig.inputs.push(2);
    aig.inputs.push(4);
    aig.input_names.insert(4, "controllable_c".to_string());
    aig.latches.push(Latch { out: 6, next: 2 });
    aig.latches.push(Latch { out: 8, next: 4 });
    aig.ands.push(AndGate { out: 10, a: 6, b: 9 });
    aig.outputs.push(10);
    aig
}

/// §8 scenario 6: a 3-deep shift register with a dangling controllable
/// input, forcing the IC3-style engine past its first frame.
fn shift_register() -> Aig {
    let mut aig = Aig { max_var: 5, ..Aig::new() };
    aig.inputs.push(2);
    aig.inputs.push(10);
    aig.input_names.insert(10, "controllable_c".to_string());
    aig.latches.push(Latch { out: 4, next: 2 });
    aig.latches.push(Latch { out: 6, next: 4 });
    aig.latches.push(Latch { out: 8, next: 6 });
    aig.outputs.push(8);
    aig
}

fn solving_scenario_two_latch_race_learning(c: &mut criterion::Criterion) {
    let aig = two_latch_race();
    c.bench_function("learning engine: two-latch race", |b| {
        b.iter(|| {
            let mut vars = VarStore::new();
            let model = Model::build(&aig, &mut vars).unwrap();
            let qbf = ReductionQbfSolver::new(InProcessSatSolver::new(true), resyn::expand::DEFAULT_CLAUSE_BUDGET);
            let mut engine = LearningEngine::new(&mut vars, model, qbf, LearningOptions::default());
            engine.run()
        })
    });
}

fn solving_scenario_two_latch_race_ic3(c: &mut criterion::Criterion) {
    let aig = two_latch_race();
    c.bench_function("frame engine: two-latch race", |b| {
        b.iter(|| {
            let mut vars = VarStore::new();
            let model = Model::build(&aig, &mut vars).unwrap();
            let solver = InProcessSatSolver::new(true);
            let mut engine = FrameEngine::new(&mut vars, model, solver);
            engine.run()
        })
    });
}

fn solving_shift_register_ic3(c: &mut criterion::Criterion) {
    let aig = shift_register();
    c.bench_function("frame engine: shift register (multi-frame)", |b| {
        b.iter(|| {
            let mut vars = VarStore::new();
            let model = Model::build(&aig, &mut vars).unwrap();
            let solver = InProcessSatSolver::new(true);
            let mut engine = FrameEngine::new(&mut vars, model, solver);
            engine.run()
        })
    });
}

fn extracting_and_embedding_strategy(c: &mut criterion::Criterion) {
    let aig = two_latch_race();
    c.bench_function("extract candidate strategy and embed it", |b| {
        b.iter(|| {
            let mut vars = VarStore::new();
            let model = Model::build(&aig, &mut vars).unwrap();
            let solver = InProcessSatSolver::new(true);
            let mut engine = FrameEngine::new(&mut vars, model.clone(), solver);
            let w = match engine.run() {
                resyn::verdict::Verdict::Realizable(w) => w,
                resyn::verdict::Verdict::Unrealizable => unreachable!(),
            };
            let mut extractor = CandidateExtractor::new(aig.max_var);
            let strategy = extractor.extract(&mut vars, &model, &w).unwrap();
            let order = controllable_literal_order(&model);
            aig::embed(&aig, &strategy, &order).unwrap()
        })
    });
}

fn tseitin_negating_transition_relation(c: &mut criterion::Criterion) {
    let aig = two_latch_race();
    c.bench_function("Tseitin-negate a transition relation", |b| {
        b.iter(|| {
            let mut vars = VarStore::new();
            let model = Model::build(&aig, &mut vars).unwrap();
            model.trans.negate(&mut vars)
        })
    });
}
