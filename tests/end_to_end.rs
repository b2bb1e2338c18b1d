//! Integration tests for the end-to-end scenarios of spec.md §8: small
//! literal AIGs built in-memory, fed through each back end, asserting the
//! expected verdict and, where realizable, that the embedded strategy
//! actually keeps the error output unreachable (Testable Property 9),
//! checked here by explicit-state reachability over the small state
//! spaces these scenarios admit rather than an external model checker.

use resyn::aig::{self, Aig, AigLit, AndGate, Latch};
use resyn::extract::{controllable_literal_order, CandidateExtractor, StrategyExtractor};
use resyn::ic3::FrameEngine;
use resyn::learn::{LearningEngine, LearningOptions};
use resyn::qbf::ReductionQbfSolver;
use resyn::sat::InProcessSatSolver;
use resyn::spec::Model;
use resyn::vars::VarStore;
use std::collections::{HashMap, HashSet};

fn var_of(lit: AigLit) -> u32 {
    aig::var_of(lit)
}

fn eval_lit(lit: AigLit, values: &HashMap<u32, bool>) -> bool {
    if lit == aig::FALSE {
        return false;
    }
    if lit == aig::TRUE {
        return true;
    }
    let v = values[&var_of(lit)];
    v ^ aig::is_negated(lit)
}

/// Evaluates every AND gate, the error output, and each latch's next value
/// for one step, given the current latch values and an assignment for every
/// remaining (uncontrollable) input. `aig.ands` is assumed topologically
/// ordered, which every AIGER producer (including [`aig::embed`]) respects.
fn step(aig: &Aig, state: &HashMap<u32, bool>, inputs: &HashMap<u32, bool>) -> (bool, HashMap<u32, bool>) {
    let mut values = HashMap::new();
    for (&var, &v) in state {
        values.insert(var, v);
    }
    for (&var, &v) in inputs {
        values.insert(var, v);
    }
    for gate in &aig.ands {
        let a = eval_lit(gate.a, &values);
        let b = eval_lit(gate.b, &values);
        values.insert(var_of(gate.out), a && b);
    }
    let error = aig
        .outputs
        .first()
        .map(|&o| eval_lit(o, &values))
        .unwrap_or(false);
    let mut next_state = HashMap::new();
    for latch in &aig.latches {
        next_state.insert(var_of(latch.out), eval_lit(latch.next, &values));
    }
    (error, next_state)
}

/// Brute-force BFS over every reachable state (across every assignment of
/// whatever inputs remain, i.e. the antagonist's uncontrollable moves once
/// a strategy has already fixed the controllable ones) from the all-zero
/// initial state. Feasible here because every scenario below has at most a
/// handful of latches and inputs.
fn error_is_reachable(aig: &Aig) -> bool {
    let latch_vars: Vec<u32> = aig.latches.iter().map(|l| var_of(l.out)).collect();
    let input_vars: Vec<u32> = aig.inputs.iter().map(|&i| var_of(i)).collect();

    let mut state: HashMap<u32, bool> = latch_vars.iter().map(|&v| (v, false)).collect();
    let mut visited = HashSet::new();
    let mut queue = vec![state.clone()];
    visited.insert(state_key(&state, &latch_vars));

    while let Some(s) = queue.pop() {
        let n = input_vars.len();
        for mask in 0..(1u32 << n) {
            let inputs: HashMap<u32, bool> = input_vars
                .iter()
                .enumerate()
                .map(|(i, &v)| (v, (mask >> i) & 1 == 1))
                .collect();
            let (error, next) = step(aig, &s, &inputs);
            if error {
                return true;
            }
            let key = state_key(&next, &latch_vars);
            if visited.insert(key) {
                queue.push(next);
            }
        }
        let _ = &mut state; // silence unused-mut in the degenerate zero-latch case
    }
    false
}

fn state_key(state: &HashMap<u32, bool>, order: &[u32]) -> Vec<bool> {
    order.iter().map(|v| state[v]).collect()
}

fn extract_and_embed(aig: &Aig, vars: &mut VarStore, model: &Model, w: &resyn::cnf::Cnf) -> Aig {
    let mut extractor = CandidateExtractor::new(aig.max_var);
    let strategy = extractor.extract(vars, model, w).expect("extraction succeeds for a realizable instance");
    let input_order = controllable_literal_order(model);
    aig::embed(aig, &strategy, &input_order).expect("embedding succeeds")
}

fn run_learning(aig: &Aig) -> resyn::verdict::Verdict {
    let mut vars = VarStore::new();
    let model = Model::build(aig, &mut vars).unwrap();
    let qbf = ReductionQbfSolver::new(InProcessSatSolver::new(true), resyn::expand::DEFAULT_CLAUSE_BUDGET);
    let mut engine = LearningEngine::new(&mut vars, model, qbf, LearningOptions::default());
    engine.run()
}

fn run_ic3(aig: &Aig) -> resyn::verdict::Verdict {
    let mut vars = VarStore::new();
    let model = Model::build(aig, &mut vars).unwrap();
    let solver = InProcessSatSolver::new(true);
    let mut engine = FrameEngine::new(&mut vars, model, solver);
    engine.run()
}

/// Scenario 1: one latch, no inputs, `error = s`, `s' = 0`, one unused
/// controllable input. Expected: realizable; `c` realized as constant 0;
/// embedded error unreachable.
#[test]
fn scenario_1_single_latch_no_inputs() {
    let mut aig = Aig { max_var: 2, ..Aig::new() };
    aig.inputs.push(4);
    aig.input_names.insert(4, "controllable_c".to_string());
    aig.latches.push(Latch { out: 2, next: 0 });
    aig.outputs.push(2);

    assert!(run_learning(&aig).is_realizable());
    assert!(run_ic3(&aig).is_realizable());

    let mut vars = VarStore::new();
    let model = Model::build(&aig, &mut vars).unwrap();
    let w = match run_ic3(&aig) {
        resyn::verdict::Verdict::Realizable(w) => w,
        _ => unreachable!(),
    };
    let embedded = extract_and_embed(&aig, &mut vars, &model, &w);
    assert!(embedded.inputs.is_empty(), "the only input was controllable and is now gone");
    assert!(!error_is_reachable(&embedded));
}

/// Scenario 2: one latch, `s' = i ∧ ¬c`, `error = s`, `c` controllable.
/// Expected: realizable; embedded error unreachable regardless of `i`.
#[test]
fn scenario_2_one_uncontrollable() {
    let mut aig = Aig { max_var: 4, ..Aig::new() };
    aig.inputs.push(2); // uncontrollable i
    aig.inputs.push(4); // controllable c
    aig.input_names.insert(4, "controllable_c".to_string());
    aig.ands.push(AndGate { out: 6, a: 2, b: 5 }); // i ∧ ¬c
    aig.latches.push(Latch { out: 8, next: 6 });
    aig.outputs.push(8);

    assert!(run_learning(&aig).is_realizable());
    assert!(run_ic3(&aig).is_realizable());

    let mut vars = VarStore::new();
    let model = Model::build(&aig, &mut vars).unwrap();
    let w = match run_learning(&aig) {
        resyn::verdict::Verdict::Realizable(w) => w,
        _ => unreachable!(),
    };
    let embedded = extract_and_embed(&aig, &mut vars, &model, &w);
    assert!(!error_is_reachable(&embedded));
}

/// Scenario 3: unsafe initial state. A single latch `s` held at its reset
/// value 0 with `error = ¬s` is unsafe from the very first state,
/// regardless of any strategy — the cleanest AIG encoding of "unsafe
/// initial" available under this crate's reset-to-0 convention (§6).
/// Expected: unrealizable.
#[test]
fn scenario_3_unsafe_initial() {
    let mut aig = Aig { max_var: 2, ..Aig::new() };
    aig.inputs.push(4);
    aig.input_names.insert(4, "controllable_c".to_string());
    aig.latches.push(Latch { out: 2, next: 2 }); // s' = s (irrelevant, error fires at t=0)
    aig.outputs.push(3); // error = ¬s, true at the all-zero initial state

    assert!(!run_learning(&aig).is_realizable());
    assert!(!run_ic3(&aig).is_realizable());
}

/// Scenario 4: two-latch race. `a' = i`, `b' = c`, `error = a ∧ ¬b`.
/// Expected: realizable, with `c` able to track `i` one step behind so `b`
/// always catches up to `a` before `error` can be observed.
#[test]
fn scenario_4_two_latch_race() {
    let mut aig = Aig { max_var: 5, ..Aig::new() };
    aig.inputs.push(2); // uncontrollable i
    aig.inputs.push(4); // controllable c
    aig.input_names.insert(4, "controllable_c".to_string());
    aig.latches.push(Latch { out: 6, next: 2 }); // a' = i
    aig.latches.push(Latch { out: 8, next: 4 }); // b' = c
    aig.ands.push(AndGate { out: 10, a: 6, b: 9 }); // error = a ∧ ¬b
    aig.outputs.push(10);

    let learning_verdict = run_learning(&aig);
    let ic3_verdict = run_ic3(&aig);
    assert!(learning_verdict.is_realizable());
    assert!(ic3_verdict.is_realizable());

    let mut vars = VarStore::new();
    let model = Model::build(&aig, &mut vars).unwrap();
    let w = match ic3_verdict {
        resyn::verdict::Verdict::Realizable(w) => w,
        _ => unreachable!(),
    };
    let embedded = extract_and_embed(&aig, &mut vars, &model, &w);
    assert!(!error_is_reachable(&embedded));
}

/// Scenario 5: control of no value. `s' = i`, `error = s`, `c` present but
/// influences nothing. Expected: unrealizable, agreed by both back ends.
#[test]
fn scenario_5_control_of_no_value() {
    let mut aig = Aig { max_var: 3, ..Aig::new() };
    aig.inputs.push(2); // uncontrollable i
    aig.inputs.push(6); // controllable c, unused
    aig.input_names.insert(6, "controllable_c".to_string());
    aig.latches.push(Latch { out: 4, next: 2 }); // s' = i
    aig.outputs.push(4);

    assert!(!run_learning(&aig).is_realizable());
    assert!(!run_ic3(&aig).is_realizable());
}

/// Scenario 6: a shift register deep enough that the IC3-style engine
/// cannot resolve the verdict at its first frame. `a' = i`, `b' = a`,
/// `c' = b`, `error = c`; a controllable input is present but has no
/// wiring at all. Error is reachable only three antagonist moves after the
/// initial state, so `recBlockCube`'s outer loop must advance `k` past 1
/// before concluding. Expected: unrealizable (no control influence
/// whatsoever), agreed by both back ends.
#[test]
fn scenario_6_requires_multiple_frame_advances() {
    let mut aig = Aig { max_var: 5, ..Aig::new() };
    aig.inputs.push(2); // uncontrollable i
    aig.inputs.push(10); // controllable, unused
    aig.input_names.insert(10, "controllable_c".to_string());
    aig.latches.push(Latch { out: 4, next: 2 }); // a' = i
    aig.latches.push(Latch { out: 6, next: 4 }); // b' = a
    aig.latches.push(Latch { out: 8, next: 6 }); // c' = b
    aig.outputs.push(8); // error = c

    let verdict = run_ic3(&aig);
    assert!(!verdict.is_realizable());
    assert!(!run_learning(&aig).is_realizable());
}
