use crate::aig::{self, Aig, AigLit, FALSE, TRUE};
use crate::cnf::{Clause, Cnf, Literal};
use crate::error::{Error, Result};
use crate::vars::{VarId, VarKind, VarStore};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// The five derived CNFs of §3's data model, plus the bookkeeping every
/// engine needs to navigate between present/next copies and to tell
/// state/input/control variables apart.
///
/// Building a [`Model`] enforces one convention the distilled spec leaves
/// implicit: the AIG's single output must be a pure function of state, so
/// `P(s) = ¬error(s)` really is independent of the current inputs, as §3's
/// data model states. The error output may be a latch directly, a constant,
/// or any AND-gate combination of latches (§8 scenario 4's `error = a ∧ ¬b`);
/// an output whose fan-in reaches an uncontrollable or controllable input is
/// rejected as an input error rather than silently special-cased (see
/// DESIGN.md).
#[derive(Clone)]
pub struct Model {
    pub trans: Cnf,
    pub init: Cnf,
    pub safe: Cnf,
    pub next_safe: Cnf,
    pub next_unsafe: Cnf,

    /// `t` with `t → T` baked into every clause of `trans` (§3). Assuming
    /// `t` enables the transition relation; omitting it (or assuming `¬t`)
    /// makes `trans` vacuously true, without needing push/pop.
    pub activation: VarId,

    pub state_vars: Vec<VarId>,
    pub next_state_vars: Vec<VarId>,
    pub uncontrollable_vars: Vec<VarId>,
    pub controllable_vars: Vec<VarId>,
    pub error_var: VarId,
    pub error_negated: bool,

    /// Bidirectional present↔next pairing, the `pair` argument every
    /// `swap_present_to_next` call in this crate is built from.
    present_to_next: HashMap<VarId, VarId>,
    next_to_present: HashMap<VarId, VarId>,

    /// AIG-variable-index → propositional `VarId`, kept so the strategy
    /// extractor and AIG embedder can map back to AIG literals.
    pub aig_var_of: HashMap<VarId, AigLit>,
}

impl Model {
    pub fn present_to_next(&self, id: VarId) -> VarId {
        self.present_to_next
            .get(&id)
            .copied()
            .unwrap_or(id)
    }

    pub fn next_to_present(&self, id: VarId) -> VarId {
        self.next_to_present.get(&id).copied().unwrap_or(id)
    }

    /// The involution `swap_present_to_next` calls are built from:
    /// present ↦ next and next ↦ present, identity elsewhere.
    pub fn present_next_pair(&self, id: VarId) -> VarId {
        if let Some(&n) = self.present_to_next.get(&id) {
            return n;
        }
        if let Some(&p) = self.next_to_present.get(&id) {
            return p;
        }
        id
    }

    pub fn error_literal(&self) -> Literal {
        Literal::signed(self.error_var, self.error_negated)
    }

    /// Builds the specification model from a parsed AIG, allocating all
    /// its variables in `vars`.
    pub fn build(aig: &Aig, vars: &mut VarStore) -> Result<Model> {
        aig.validate()?;

        let mut var_of_aig: HashMap<u32, VarId> = HashMap::new();
        let mut aig_var_of: HashMap<VarId, AigLit> = HashMap::new();
        let controllable = aig.controllable_inputs();
        let controllable_set: std::collections::HashSet<_> = controllable.iter().copied().collect();

        let mut uncontrollable_vars = Vec::new();
        let mut controllable_vars = Vec::new();
        let mut support_input: HashMap<VarId, bool> = HashMap::new();
        for &lit in &aig.inputs {
            let kind = if controllable_set.contains(&lit) {
                VarKind::Controllable
            } else {
                VarKind::Uncontrollable
            };
            let name = aig.input_names.get(&lit).cloned();
            let id = vars.fresh_named(kind, lit, name);
            var_of_aig.insert(aig::var_of(lit), id);
            aig_var_of.insert(id, lit);
            support_input.insert(id, true);
            match kind {
                VarKind::Controllable => controllable_vars.push(id),
                _ => uncontrollable_vars.push(id),
            }
        }

        let mut state_vars = Vec::with_capacity(aig.latches.len());
        for latch in &aig.latches {
            let name = aig.latch_names.get(&latch.out).cloned();
            let id = vars.fresh_named(VarKind::State, latch.out, name);
            var_of_aig.insert(aig::var_of(latch.out), id);
            aig_var_of.insert(id, latch.out);
            support_input.insert(id, false);
            state_vars.push(id);
        }

        let mut trans = Cnf::new();
        let activation = vars.fresh(VarKind::Temporary);
        // a dedicated always-true variable so gate operands that are AIGER
        // constants (literal 0/1) resolve to an ordinary literal instead of
        // needing special-cased handling at every call site.
        let true_var = vars.fresh(VarKind::Temporary);
        support_input.insert(true_var, false);
        trans.add(Clause::unit(Literal::positive(true_var)));

        let guard = |clause: Clause, activation: VarId| -> Clause {
            let mut lits = clause.literals().to_vec();
            lits.push(Literal::negative(activation));
            Clause::new(lits).unwrap_or_else(|| {
                // a tautology here means the raw Tseitin clause already
                // contained ¬activation, which cannot happen: activation is
                // freshly allocated and appears in no other clause yet.
                unreachable!("activation literal collides with an existing clause")
            })
        };

        let resolve = |var_of_aig: &HashMap<u32, VarId>, true_var: VarId, lit: AigLit| -> Literal {
            if lit == FALSE {
                return Literal::negative(true_var);
            }
            if lit == TRUE {
                return Literal::positive(true_var);
            }
            let var = var_of_aig[&aig::var_of(lit)];
            Literal::signed(var, aig::is_negated(lit))
        };

        let mut gate_literals: Vec<(VarId, Literal, Literal)> = Vec::with_capacity(aig.ands.len());
        let mut gate_index: HashMap<VarId, usize> = HashMap::new();

        for gate in &aig.ands {
            let out_id = vars.fresh(VarKind::Temporary);
            var_of_aig.insert(aig::var_of(gate.out), out_id);
            aig_var_of.insert(out_id, gate.out);
            let out_lit = Literal::positive(out_id);
            let a = resolve(&var_of_aig, true_var, gate.a);
            let b = resolve(&var_of_aig, true_var, gate.b);

            let depends = *support_input.get(&a.var()).unwrap_or(&false)
                || *support_input.get(&b.var()).unwrap_or(&false);
            support_input.insert(out_id, depends);
            gate_index.insert(out_id, gate_literals.len());
            gate_literals.push((out_id, a, b));

            // Tseitin encoding of out ↔ a ∧ b
            trans.add(guard(
                Clause::new([out_lit.negated(), a]).expect("fresh var, no conflict"),
                activation,
            ));
            trans.add(guard(
                Clause::new([out_lit.negated(), b]).expect("fresh var, no conflict"),
                activation,
            ));
            trans.add(guard(
                Clause::new([out_lit, a.negated(), b.negated()])
                    .expect("fresh var, no conflict"),
                activation,
            ));
        }

        let mut next_state_vars = Vec::with_capacity(state_vars.len());
        let mut present_to_next = HashMap::new();
        let mut next_to_present = HashMap::new();
        for (latch, &present) in aig.latches.iter().zip(state_vars.iter()) {
            let next_lit = resolve(&var_of_aig, true_var, latch.next);
            let next_id = vars.fresh(VarKind::NextState);
            next_state_vars.push(next_id);
            present_to_next.insert(present, next_id);
            next_to_present.insert(next_id, present);

            let next_var_lit = Literal::positive(next_id);
            trans.add(guard(
                Clause::new([next_var_lit.negated(), next_lit]).expect("fresh var"),
                activation,
            ));
            trans.add(guard(
                Clause::new([next_var_lit, next_lit.negated()]).expect("fresh var"),
                activation,
            ));
        }

        let error_output = aig
            .error_output()
            .ok_or_else(|| Error::input("no output declared"))?;
        let error_lit = resolve(&var_of_aig, true_var, error_output);
        let error_var = error_lit.var();
        let error_negated = error_lit.is_negative();
        if *support_input.get(&error_var).unwrap_or(&false) {
            return Err(Error::input(
                "the error output must be a pure function of state (§3: P(s) = ¬error(s)); \
                 it may not read an uncontrollable or controllable input directly",
            ));
        }

        // §8 scenario 4's `error = a ∧ ¬b` needs a "next" copy of the error
        // signal's whole fan-in cone, not just of a single latch: walk the
        // cone (stopping at latches/the constant `true_var`, both of which
        // already have a next-time counterpart) and rebuild the same
        // AND-gate network over next-state variables.
        let cone = collect_cone(error_var, &gate_index, &gate_literals);

        let mut next_copy: HashMap<VarId, VarId> = HashMap::new();
        for idx in cone {
            let (out_id, a, b) = gate_literals[idx];
            let next_operand = |lit: Literal| -> Literal {
                let base = if lit.var() == true_var {
                    true_var
                } else if let Some(&nv) = present_to_next.get(&lit.var()) {
                    nv
                } else {
                    next_copy[&lit.var()]
                };
                Literal::signed(base, lit.is_negative())
            };
            let na = next_operand(a);
            let nb = next_operand(b);
            let next_out = vars.fresh(VarKind::Temporary);
            next_copy.insert(out_id, next_out);
            let next_out_lit = Literal::positive(next_out);
            trans.add(guard(
                Clause::new([next_out_lit.negated(), na]).expect("fresh var"),
                activation,
            ));
            trans.add(guard(
                Clause::new([next_out_lit.negated(), nb]).expect("fresh var"),
                activation,
            ));
            trans.add(guard(
                Clause::new([next_out_lit, na.negated(), nb.negated()]).expect("fresh var"),
                activation,
            ));
        }

        let next_error_var = if error_var == true_var {
            true_var
        } else if let Some(&nv) = present_to_next.get(&error_var) {
            nv
        } else {
            next_copy[&error_var]
        };

        let mut init = Cnf::new();
        for &s in &state_vars {
            init.add(Clause::unit(Literal::negative(s)));
        }

        let mut safe = Cnf::new();
        safe.add(Clause::unit(Literal::signed(error_var, !error_negated)));

        let mut next_safe = Cnf::new();
        next_safe.add(Clause::unit(Literal::signed(next_error_var, !error_negated)));
        let next_unsafe = next_safe.negate(vars);

        Ok(Model {
            trans,
            init,
            safe,
            next_safe,
            next_unsafe,
            activation,
            state_vars,
            next_state_vars,
            uncontrollable_vars,
            controllable_vars,
            error_var,
            error_negated,
            present_to_next,
            next_to_present,
            aig_var_of,
        })
    }
}

/// `root`'s fan-in cone, following `gate_index`/`gate_literals` and stopping
/// at leaves (latches, inputs, `true_var`) that have no entry in
/// `gate_index`. Built as an explicit dependency `DiGraph` (edge `gate ->
/// operand`) and topologically sorted, rather than hand-rolled recursion, so
/// the ordering guarantee ("each gate's operands already appear before it")
/// is the graph library's invariant rather than this function's.
fn collect_cone(
    root: VarId,
    gate_index: &HashMap<VarId, usize>,
    gate_literals: &[(VarId, Literal, Literal)],
) -> Vec<usize> {
    let mut graph: DiGraph<VarId, ()> = DiGraph::new();
    let mut node_of: HashMap<VarId, NodeIndex> = HashMap::new();
    let mut node_for = |graph: &mut DiGraph<VarId, ()>, node_of: &mut HashMap<VarId, NodeIndex>, v: VarId| -> NodeIndex {
        *node_of.entry(v).or_insert_with(|| graph.add_node(v))
    };

    let mut stack = vec![root];
    let mut visited = std::collections::HashSet::new();
    while let Some(v) = stack.pop() {
        if !visited.insert(v) {
            continue;
        }
        node_for(&mut graph, &mut node_of, v);
        if let Some(&idx) = gate_index.get(&v) {
            let (_, a, b) = gate_literals[idx];
            for operand in [a.var(), b.var()] {
                let from = node_for(&mut graph, &mut node_of, v);
                let to = node_for(&mut graph, &mut node_of, operand);
                graph.add_edge(from, to, ());
                stack.push(operand);
            }
        }
    }

    // topological order has every gate before its operands (edges point
    // gate -> operand); reverse it so operands precede the gates reading
    // them, matching the order `trans` clauses must be emitted in.
    let order = petgraph::algo::toposort(&graph, None)
        .expect("the AIG's AND-gate fan-in is acyclic by construction");
    order
        .into_iter()
        .rev()
        .filter_map(|node| gate_index.get(&graph[node]).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::Latch;

    /// scenario 1 of §8: one latch `s`, no inputs, `s' = 0`, error = s, one
    /// unused controllable input.
    fn scenario_single_latch() -> Aig {
        let mut aig = Aig {
            max_var: 2,
            ..Aig::new()
        };
        aig.inputs.push(4); // controllable, literal 4 (var 2), unused
        aig.input_names.insert(4, "controllable_c".to_string());
        aig.latches.push(Latch { out: 2, next: 0 });
        aig.outputs.push(2);
        aig
    }

    #[test]
    fn builds_init_as_all_zero() {
        let aig = scenario_single_latch();
        let mut vars = VarStore::new();
        let model = Model::build(&aig, &mut vars).unwrap();
        assert_eq!(model.init.len(), model.state_vars.len());
        for clause in model.init.clauses() {
            assert!(clause.literals()[0].is_negative());
        }
    }

    #[test]
    fn error_must_not_read_an_input_directly() {
        let mut aig = scenario_single_latch();
        aig.outputs = vec![4]; // points at the controllable input instead
        let mut vars = VarStore::new();
        assert!(Model::build(&aig, &mut vars).is_err());
    }

    #[test]
    fn present_next_pair_is_involutive() {
        let aig = scenario_single_latch();
        let mut vars = VarStore::new();
        let model = Model::build(&aig, &mut vars).unwrap();
        let s = model.state_vars[0];
        let n = model.present_next_pair(s);
        assert_eq!(model.present_next_pair(n), s);
    }

    /// §8 scenario 4: two latches `a,b` with `a' = i`, `b' = c`, and
    /// `error = a ∧ ¬b` — a genuine AND-gate combination of two latches,
    /// not a single latch output. Exercises the fan-in-cone "next copy"
    /// construction used when the error signal isn't a bare state bit.
    fn scenario_two_latch_race() -> Aig {
        let mut aig = Aig {
            max_var: 5,
            ..Aig::new()
        };
        aig.inputs.push(2); // uncontrollable i, var 1
        aig.inputs.push(4); // controllable c, var 2
        aig.input_names.insert(4, "controllable_c".to_string());
        aig.latches.push(Latch { out: 6, next: 2 }); // a' = i, var 3
        aig.latches.push(Latch { out: 8, next: 4 }); // b' = c, var 4
        // error = a ∧ ¬b, var 5 (literal 10): a=6, ¬b=9
        aig.ands.push(crate::aig::AndGate { out: 10, a: 6, b: 9 });
        aig.outputs.push(10);
        aig
    }

    #[test]
    fn builds_model_for_error_as_and_of_two_latches() {
        let aig = scenario_two_latch_race();
        let mut vars = VarStore::new();
        let model = Model::build(&aig, &mut vars).unwrap();
        assert_eq!(model.state_vars.len(), 2);
        // error is the AND-gate's temporary, not either latch directly
        assert!(!model.state_vars.contains(&model.error_var));
        assert!(!model.error_negated);
        // next_safe must constrain a freshly built next-time copy of the
        // error cone, not the present-time error variable itself
        let next_safe_var = model.next_safe.clauses()[0].literals()[0].var();
        assert_ne!(next_safe_var, model.error_var);
    }
}
