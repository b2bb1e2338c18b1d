use super::graph::{negate, Aig, AigLit, FALSE, TRUE};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// The combinational AIG the strategy extractor hands back: inputs are a
/// subset of the specification's `(i,s)` literals (by construction, never
/// fresh ones), outputs are one literal per controllable input, in the same
/// order as [`Aig::controllable_inputs`].
pub struct StrategyAig {
    pub ands: Vec<(AigLit, AigLit, AigLit)>, // (out, a, b), out values are the extractor's own numbering
    pub outputs: Vec<AigLit>,
    pub max_var: u32,
}

/// Splices `strategy` into `spec`, removing the controllable inputs and
/// wiring each to the AND-gate computing its value (§4.9's AIG embedding).
///
/// Steps, matching §4.9 (a)-(e):
/// 1. build a rename map from the extractor's input literals onto `spec`'s
///    `(i,s)` literals, and from the extractor's AND outputs onto fresh
///    literals above `spec.max_var`;
/// 2. for every controllable input, attach its realizing signal — either
///    directly (if it renames onto an AND-gate output) or via a pass-through
///    AND gate with the other operand fixed to `TRUE` (§9's corner case:
///    constant or uncontrollable-input outputs still need a rename-safe
///    wiring);
/// 3. remove the controllable inputs from `spec.inputs`;
/// 4. append the renamed AND gates;
/// 5. update `max_var`.
pub fn embed(spec: &Aig, strategy: &StrategyAig, input_order: &[AigLit]) -> Result<Aig> {
    if strategy.outputs.len() != input_order.len() {
        return Err(Error::logic(format!(
            "strategy produced {} outputs for {} controllable inputs",
            strategy.outputs.len(),
            input_order.len()
        )));
    }

    let mut out = spec.clone();
    let controllable: std::collections::HashSet<_> = input_order.iter().copied().collect();
    out.inputs.retain(|lit| !controllable.contains(lit));
    for lit in input_order {
        out.input_names.remove(lit);
    }

    // extractor AND-gate outputs renamed to fresh literals above spec's max
    let mut rename: HashMap<AigLit, AigLit> = HashMap::new();
    for &(gate_out, _, _) in &strategy.ands {
        let fresh = out.fresh_var();
        rename.insert(gate_out, fresh);
    }
    let resolve = |lit: AigLit, rename: &HashMap<AigLit, AigLit>| -> AigLit {
        let var = super::graph::var_of(lit);
        let base = var * 2;
        let renamed_base = *rename.get(&base).unwrap_or(&base);
        if super::graph::is_negated(lit) {
            negate(renamed_base)
        } else {
            renamed_base
        }
    };

    for &(gate_out, a, b) in &strategy.ands {
        let new_out = rename[&gate_out];
        let new_a = resolve(a, &rename);
        let new_b = resolve(b, &rename);
        out.ands.push(super::graph::AndGate {
            out: new_out,
            a: new_a,
            b: new_b,
        });
    }

    for (&c_lit, &strategy_out) in input_order.iter().zip(strategy.outputs.iter()) {
        let realized = match strategy_out {
            FALSE => and_with_true(&mut out, FALSE),
            TRUE => and_with_true(&mut out, TRUE),
            other => resolve(other, &rename),
        };
        // every occurrence of c_lit (or its negation) in spec's ands/latches/
        // outputs must now read `realized` instead; achieved by adding an
        // identity rename entry keyed on the controllable input's own literal.
        rename.insert(c_lit, realized);
    }

    // second pass: re-resolve spec's own gates/latches/outputs through the
    // controllable-input rename entries recorded above. the gates appended
    // from the strategy never mention a controllable input literal, so this
    // only touches `spec`'s original structure.
    for gate in out.ands.iter_mut().take(spec.ands.len()) {
        gate.a = rename.get(&base_lit(gate.a)).map_or(gate.a, |&r| {
            apply_polarity(gate.a, r)
        });
        gate.b = rename.get(&base_lit(gate.b)).map_or(gate.b, |&r| {
            apply_polarity(gate.b, r)
        });
    }
    for latch in out.latches.iter_mut() {
        latch.next = rename
            .get(&base_lit(latch.next))
            .map_or(latch.next, |&r| apply_polarity(latch.next, r));
    }
    for output in out.outputs.iter_mut() {
        *output = rename
            .get(&base_lit(*output))
            .map_or(*output, |&r| apply_polarity(*output, r));
    }

    Ok(out)
}

fn base_lit(lit: AigLit) -> AigLit {
    super::graph::var_of(lit) * 2
}

fn apply_polarity(original: AigLit, renamed_base: AigLit) -> AigLit {
    if super::graph::is_negated(original) {
        negate(renamed_base)
    } else {
        renamed_base
    }
}

/// §9's corner case: a constant extractor output (0 or 1) still needs a
/// gate to rename onto, so the controllable input's old literal has
/// somewhere sound to point. `lit ∧ TRUE` realizes `lit` unchanged with an
/// explicit AND gate.
fn and_with_true(aig: &mut Aig, lit: AigLit) -> AigLit {
    aig.push_and(lit, TRUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_removes_controllable_inputs_and_wires_constant_strategy() {
        let mut spec = Aig {
            max_var: 2,
            ..Aig::new()
        };
        spec.inputs.push(2); // uncontrollable i
        spec.inputs.push(4); // controllable c
        spec.input_names.insert(4, "controllable_c".to_string());
        spec.outputs.push(4); // error = c, so realizing c = 0 makes it unreachable

        let strategy = StrategyAig {
            ands: vec![],
            outputs: vec![FALSE],
            max_var: 0,
        };
        let embedded = embed(&spec, &strategy, &[4]).unwrap();
        assert!(!embedded.inputs.contains(&4));
        assert_eq!(embedded.inputs, vec![2]);
        // the output no longer reads the removed literal 4 directly
        assert_ne!(embedded.outputs[0], 4);
    }
}
