use super::kind::VarKind;
use super::variable::{VarId, Variable};

/// A stack frame recording enough to undo every allocation made after it was
/// pushed: the next fresh id, and how many variables of each kind existed.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    next_id: VarId,
    per_kind_len: [usize; VarKind::ALL.len()],
}

/// The process-wide registry of propositional variables. By design this is
/// explicit rather than global state: every CNF operation and engine
/// constructor here takes a `&mut VarStore` (or, in the parallel
/// coordinator, an `Arc<RwLock<VarStore>>`) instead of reaching for a
/// singleton.
///
/// `fresh` is monotone and never reuses an id while its kind-bucket is live;
/// `push`/`pop`/`reset_to_last_push` implement the snapshot discipline that
/// bounds the growth of Tseitin temporaries across fixpoint iteration.
#[derive(Debug, Default)]
pub struct VarStore {
    variables: Vec<Variable>,
    by_kind: [Vec<VarId>; VarKind::ALL.len()],
    snapshots: Vec<Snapshot>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot_now(&self) -> Snapshot {
        let mut per_kind_len = [0usize; VarKind::ALL.len()];
        for kind in VarKind::ALL {
            per_kind_len[kind.index()] = self.by_kind[kind.index()].len();
        }
        Snapshot {
            next_id: self.variables.len() as VarId + 1,
            per_kind_len,
        }
    }

    /// Allocates a fresh variable of `kind`, with no AIG literal and no
    /// name. Never reuses an id that is still live.
    pub fn fresh(&mut self, kind: VarKind) -> VarId {
        self.fresh_named(kind, 0, None)
    }

    /// Allocates a fresh variable tagged with an AIGER literal (for
    /// variables that mirror an AIG signal) and an optional name (for
    /// inputs/latches carried through from the specification's AIG).
    pub fn fresh_named(&mut self, kind: VarKind, aig_literal: u32, name: Option<String>) -> VarId {
        let id = self.variables.len() as VarId + 1;
        self.variables.push(Variable::new(id, kind, aig_literal, name));
        self.by_kind[kind.index()].push(id);
        id
    }

    pub fn info(&self, id: VarId) -> &Variable {
        &self.variables[(id - 1) as usize]
    }

    pub fn info_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[(id - 1) as usize]
    }

    pub fn vars_of(&self, kind: VarKind) -> &[VarId] {
        &self.by_kind[kind.index()]
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Performs the single permitted reclassification: a variable
    /// allocated as a placeholder kind during initial model construction is
    /// retagged once its true role (state/uncontrollable/controllable) is
    /// known.
    pub fn reclassify(&mut self, id: VarId, kind: VarKind) {
        let old_kind = self.info(id).kind();
        debug_assert_ne!(old_kind, kind, "reclassify to the same kind is a no-op bug");
        self.by_kind[old_kind.index()].retain(|&v| v != id);
        self.by_kind[kind.index()].push(id);
        self.info_mut(id).reclassify(kind);
    }

    /// Pushes a snapshot. Temporaries allocated after this point can be
    /// bulk-released with `pop` or `reset_to_last_push`.
    pub fn push(&mut self) {
        self.snapshots.push(self.snapshot_now());
    }

    /// Pops the top snapshot, discarding every variable allocated since it
    /// was pushed. Any CNF still referencing a discarded id is invalid from
    /// this point on — callers must rebuild or drop such CNFs first.
    pub fn pop(&mut self) {
        let snap = self.snapshots.pop().expect("pop without matching push");
        self.restore(snap);
    }

    /// Discards temporaries introduced since the top snapshot without
    /// popping it, so the same snapshot can be reused for the next phase.
    /// This is the operation the periodic maintenance step of §4.5 uses
    /// every N blocked cubes.
    pub fn reset_to_last_push(&mut self) {
        let snap = *self.snapshots.last().expect("reset without a push");
        self.restore(snap);
    }

    fn restore(&mut self, snap: Snapshot) {
        self.variables.truncate((snap.next_id - 1) as usize);
        for kind in VarKind::ALL {
            self.by_kind[kind.index()].truncate(snap.per_kind_len[kind.index()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_dense_and_monotone() {
        let mut vs = VarStore::new();
        let a = vs.fresh(VarKind::State);
        let b = vs.fresh(VarKind::State);
        let c = vs.fresh(VarKind::Uncontrollable);
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(vs.vars_of(VarKind::State), &[1, 2]);
        assert_eq!(vs.vars_of(VarKind::Uncontrollable), &[3]);
    }

    #[test]
    fn pop_discards_allocations_since_push() {
        let mut vs = VarStore::new();
        vs.fresh(VarKind::State);
        vs.push();
        vs.fresh(VarKind::Temporary);
        vs.fresh(VarKind::Temporary);
        assert_eq!(vs.len(), 3);
        vs.pop();
        assert_eq!(vs.len(), 1);
        assert!(vs.vars_of(VarKind::Temporary).is_empty());
    }

    #[test]
    fn reset_to_last_push_keeps_snapshot_reusable() {
        let mut vs = VarStore::new();
        vs.push();
        vs.fresh(VarKind::Temporary);
        vs.reset_to_last_push();
        assert_eq!(vs.len(), 0);
        vs.fresh(VarKind::Temporary);
        vs.reset_to_last_push();
        assert_eq!(vs.len(), 0);
        // the snapshot is still on the stack and can still be popped
        vs.pop();
    }

    #[test]
    fn reclassify_moves_between_kind_buckets() {
        let mut vs = VarStore::new();
        let id = vs.fresh(VarKind::Temporary);
        vs.reclassify(id, VarKind::State);
        assert!(vs.vars_of(VarKind::Temporary).is_empty());
        assert_eq!(vs.vars_of(VarKind::State), &[id]);
        assert_eq!(vs.info(id).kind(), VarKind::State);
    }
}
