//! The QBF backend interface of §4.3: a quantifier prefix in prenex form
//! over a matrix CNF, satisfiability and model extraction for the
//! outermost existentials, unsat cores over assumption cubes, and
//! optional incremental mode and preprocessing.
//!
//! Two backends are provided: [`reduction::ReductionQbfSolver`], the
//! `qbf_reduction` back end of §6 that discharges every query through
//! [`crate::expand`]'s universal expansion followed by the SAT interface
//! (in-process, no external QBF dependency needed); and
//! [`external::ExternalQbfSolver`], which shells out to a QDIMACS-speaking
//! binary exactly as [`crate::sat::ExternalSatSolver`] does for SAT.

mod external;
mod reduction;

pub use external::ExternalQbfSolver;
pub use reduction::ReductionQbfSolver;

use crate::cnf::{Clause, Cnf, Cube};
use crate::vars::{VarKind, VarStore};

/// One block of the prefix: a quantifier over a kind of variable. Prefixes
/// are specified by variable *kind* per §4.3's note that "the implementer
/// may accept either kinds or explicit variable sets; both are
/// equivalent" — kinds are what every caller in this crate already has on
/// hand (state/uncontrollable/controllable), so that is what is used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Forall,
    Exists,
}

#[derive(Debug, Clone)]
pub struct PrefixBlock {
    pub quantifier: Quantifier,
    pub kinds: Vec<VarKind>,
}

#[derive(Debug, Clone, Default)]
pub struct Prefix(pub Vec<PrefixBlock>);

impl Prefix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, quantifier: Quantifier, kinds: Vec<VarKind>) -> Self {
        self.0.push(PrefixBlock { quantifier, kinds });
        self
    }

    /// The outermost block, if the prefix is non-empty.
    pub fn outermost(&self) -> Option<&PrefixBlock> {
        self.0.first()
    }
}

#[derive(Debug, Clone)]
pub enum QbfVerdict {
    Sat(Cube),
    Unsat(Cube),
}

/// §4.3's interface.
pub trait QbfSolver {
    /// `vars` must be the registry the prefix's kinds were resolved
    /// against, so `vars_of(kind)` yields the real variable ids.
    fn is_sat(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> bool;
    fn is_sat_model(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> Option<Cube>;

    fn begin_inc(&mut self, prefix: &Prefix);
    fn inc_add_cnf(&mut self, cnf: &Cnf);
    /// Variables in `clause` must belong to the outermost existential
    /// block (§4.3).
    fn inc_add_clause(&mut self, clause: Clause);
    fn inc_sat_assumptions(&mut self, cube: &Cube) -> bool;
    fn inc_sat_model_or_core(&mut self, cube: &Cube) -> QbfVerdict;
    fn inc_push(&mut self);
    fn inc_pop(&mut self);
}

/// Lets [`crate::run`] pick a concrete backend at runtime from
/// `config::QbfSolverKind` without making every engine generic over a
/// trait-object type; forwards every method to the boxed value.
impl QbfSolver for Box<dyn QbfSolver> {
    fn is_sat(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> bool {
        (**self).is_sat(vars, prefix, cnf)
    }
    fn is_sat_model(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> Option<Cube> {
        (**self).is_sat_model(vars, prefix, cnf)
    }
    fn begin_inc(&mut self, prefix: &Prefix) {
        (**self).begin_inc(prefix)
    }
    fn inc_add_cnf(&mut self, cnf: &Cnf) {
        (**self).inc_add_cnf(cnf)
    }
    fn inc_add_clause(&mut self, clause: Clause) {
        (**self).inc_add_clause(clause)
    }
    fn inc_sat_assumptions(&mut self, cube: &Cube) -> bool {
        (**self).inc_sat_assumptions(cube)
    }
    fn inc_sat_model_or_core(&mut self, cube: &Cube) -> QbfVerdict {
        (**self).inc_sat_model_or_core(cube)
    }
    fn inc_push(&mut self) {
        (**self).inc_push()
    }
    fn inc_pop(&mut self) {
        (**self).inc_pop()
    }
}
