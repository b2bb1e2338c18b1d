//! Strategy extraction and AIG embedding (§4.9): given the winning region
//! `W`, synthesize a combinational function for the controllable inputs
//! and splice it into the specification AIG.
//!
//! §4.9 frames this as "the implementation invokes an external
//! Skolem/Herbrand-extraction pipeline" over the negated query `∃s,i.
//! ∀c.∃s′,t. W(s) ∧ T(s,i,c,s′) ∧ ¬W(s′)`. Two backends are provided,
//! matching the SAT/QBF modules' own "one concrete implementation per
//! backend" split: [`in_process::CandidateExtractor`], a self-contained
//! candidate-enumeration-and-verify loop (no external tool required), and
//! [`external::ExternalExtractor`], a temp-file round trip to a real
//! Skolem/Herbrand binary under `external_tools_dir`. [`optimize::optimize`]
//! is the separate, optional ABC-style rewriting pass §4.9 describes as a
//! second external step after extraction.

mod external;
mod in_process;
mod optimize;

pub use external::ExternalExtractor;
pub use in_process::CandidateExtractor;
pub use optimize::optimize;

use crate::aig::{AigLit, StrategyAig};
use crate::cnf::Cnf;
use crate::error::Result;
use crate::spec::Model;
use crate::vars::VarStore;

/// §4.9's synthesis problem, as a trait so [`crate::run`] can pick a
/// backend the same way it picks a [`crate::sat::SatSolver`] or
/// [`crate::qbf::QbfSolver`].
pub trait StrategyExtractor {
    fn extract(&mut self, vars: &mut VarStore, model: &Model, w: &Cnf) -> Result<StrategyAig>;
}

/// The controllable inputs' AIG literals, in the order
/// [`StrategyAig::outputs`] must be produced in (§4.9: "outputs c" in the
/// same order as `Aig::controllable_inputs`).
pub fn controllable_literal_order(model: &Model) -> Vec<AigLit> {
    model
        .controllable_vars
        .iter()
        .map(|&v| model.aig_var_of[&v])
        .collect()
}
