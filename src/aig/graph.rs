use std::collections::BTreeMap;

/// An AIGER literal: `2*var + polarity`. Literal `0` is constant false,
/// literal `1` is constant true. Even literals are unnegated signals, odd
/// literals are their negation.
pub type AigLit = u32;

pub const FALSE: AigLit = 0;
pub const TRUE: AigLit = 1;

pub fn var_of(lit: AigLit) -> u32 {
    lit >> 1
}

pub fn is_negated(lit: AigLit) -> bool {
    lit & 1 == 1
}

pub fn negate(lit: AigLit) -> AigLit {
    lit ^ 1
}

/// A latch: its output literal (always positive, even) and the literal
/// computing its next value. Every latch in this crate resets to 0 (§6:
/// "reset values other than 0 are not supported").
#[derive(Debug, Clone, Copy)]
pub struct Latch {
    pub out: AigLit,
    pub next: AigLit,
}

/// A two-input AND gate: `out = a ∧ b`, where `a`/`b` may themselves be
/// negated literals.
#[derive(Debug, Clone, Copy)]
pub struct AndGate {
    pub out: AigLit,
    pub a: AigLit,
    pub b: AigLit,
}

/// An and-inverter graph, parsed from or destined for AIGER. Inputs are
/// split by the `controllable_` name prefix (case-insensitive, §6) into
/// uncontrollable and controllable; latches are the state bits; exactly one
/// output is required, and it is the error signal.
#[derive(Debug, Clone, Default)]
pub struct Aig {
    pub max_var: u32,
    pub inputs: Vec<AigLit>,
    pub latches: Vec<Latch>,
    pub outputs: Vec<AigLit>,
    pub ands: Vec<AndGate>,
    pub input_names: BTreeMap<AigLit, String>,
    pub latch_names: BTreeMap<AigLit, String>,
    pub output_names: BTreeMap<AigLit, String>,
}

impl Aig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive `controllable_` prefix match (§6).
    pub fn is_controllable_name(name: &str) -> bool {
        name.len() >= "controllable_".len()
            && name[..13].eq_ignore_ascii_case("controllable_")
    }

    pub fn controllable_inputs(&self) -> Vec<AigLit> {
        self.inputs
            .iter()
            .copied()
            .filter(|lit| {
                self.input_names
                    .get(lit)
                    .is_some_and(|n| Self::is_controllable_name(n))
            })
            .collect()
    }

    pub fn uncontrollable_inputs(&self) -> Vec<AigLit> {
        let controllable: std::collections::HashSet<_> =
            self.controllable_inputs().into_iter().collect();
        self.inputs
            .iter()
            .copied()
            .filter(|lit| !controllable.contains(lit))
            .collect()
    }

    pub fn error_output(&self) -> Option<AigLit> {
        self.outputs.first().copied()
    }

    /// Allocates a fresh variable above `max_var` and returns its positive
    /// literal, bumping `max_var`.
    pub fn fresh_var(&mut self) -> AigLit {
        self.max_var += 1;
        self.max_var * 2
    }

    pub fn push_and(&mut self, a: AigLit, b: AigLit) -> AigLit {
        let out = self.fresh_var();
        self.ands.push(AndGate { out, a, b });
        out
    }

    /// Structural validation per §6/§7 Input errors: exactly one output,
    /// at least one controllable input, every latch resets to 0 (enforced
    /// at parse time, not representable here).
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.outputs.len() != 1 {
            return Err(crate::error::Error::input(format!(
                "expected exactly one output (the error signal), found {}",
                self.outputs.len()
            )));
        }
        if self.controllable_inputs().is_empty() {
            return Err(crate::error::Error::input(
                "no controllable inputs: nothing to synthesize",
            ));
        }
        Ok(())
    }
}

/// Random small safety-game instances for the `proptest-slow` cross-back-end
/// agreement tests: 0-2 uncontrollable inputs, exactly one controllable
/// input, 1-3 latches, a handful of derived AND gates, and a random error
/// output — small enough that every back end resolves them in milliseconds,
/// varied enough to exercise more than the handful of scenarios spec.md §8
/// spells out by hand.
impl crate::Arbitrary for Aig {
    fn random() -> Self {
        let mut aig = Aig::new();

        let mut pool: Vec<AigLit> = vec![FALSE];
        let num_uncontrollable = rand::random_range(0..=2usize);
        for i in 0..num_uncontrollable {
            let lit = aig.fresh_var();
            aig.inputs.push(lit);
            aig.input_names.insert(lit, format!("i{i}"));
            pool.push(lit);
        }
        let controllable = aig.fresh_var();
        aig.inputs.push(controllable);
        aig.input_names.insert(controllable, "controllable_c".to_string());
        pool.push(controllable);

        let num_latches = rand::random_range(1..=3usize);
        let mut latch_outs = Vec::new();
        for _ in 0..num_latches {
            let out = aig.fresh_var();
            latch_outs.push(out);
            pool.push(out);
        }

        fn random_literal(pool: &[AigLit]) -> AigLit {
            let base = pool[rand::random_range(0..pool.len())];
            if rand::random_range(0..2usize) == 0 {
                base
            } else {
                negate(base)
            }
        }

        let extra_gates = rand::random_range(0..=2usize);
        for _ in 0..extra_gates {
            let a = random_literal(&pool);
            let b = random_literal(&pool);
            let out = aig.push_and(a, b);
            pool.push(out);
        }

        for out in latch_outs {
            let next = random_literal(&pool);
            aig.latches.push(Latch { out, next });
        }

        aig.outputs.push(random_literal(&pool));
        aig
    }
}
