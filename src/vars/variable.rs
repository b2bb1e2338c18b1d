use super::kind::VarKind;

/// A process-unique, dense, positive variable id. Dense-from-1 is relied on
/// by [`super::store::VarStore`]'s per-kind index vectors.
pub type VarId = u32;

/// Triple (id, kind, aig-literal) plus an optional name (§3). `aig_literal`
/// is the even/odd AIGER literal the variable corresponds to, or `0` if the
/// variable has no AIG counterpart (pure Tseitin/template auxiliaries never
/// do).
#[derive(Debug, Clone)]
pub struct Variable {
    id: VarId,
    kind: VarKind,
    aig_literal: u32,
    name: Option<String>,
}

impl Variable {
    pub(super) fn new(id: VarId, kind: VarKind, aig_literal: u32, name: Option<String>) -> Self {
        Self {
            id,
            kind,
            aig_literal,
            name,
        }
    }

    pub fn id(&self) -> VarId {
        self.id
    }

    pub fn kind(&self) -> VarKind {
        self.kind
    }

    pub fn aig_literal(&self) -> u32 {
        self.aig_literal
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The single permitted reclassification, used only while the
    /// specification model is being built from the input AIG: a variable
    /// allocated generically gets its final kind once the caller learns
    /// whether it is a latch, an uncontrollable input, or a controllable
    /// input.
    pub(super) fn reclassify(&mut self, kind: VarKind) {
        self.kind = kind;
    }
}
