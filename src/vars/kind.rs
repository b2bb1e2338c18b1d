/// The closed set of tags a [`super::Variable`] can carry. Immutable after
/// assignment except for the single permitted reclassification during
/// initial model construction: a freshly allocated `Temporary` becomes a
/// `State`/`Input`/`Control` once the specification model learns what it
/// actually names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKind {
    /// A present-state bit `s`.
    State,
    /// The next-state copy `s'` of a state bit.
    NextState,
    /// An uncontrollable input `i`.
    Uncontrollable,
    /// A controllable input `c`.
    Controllable,
    /// A Tseitin activation/aux variable, scoped to the CNF that introduced
    /// it; safe to discard on `reset_to_last_push`.
    Temporary,
    /// A template parameter used by the Skolem/Herbrand extraction pipeline.
    TemplateParameter,
    /// The mirrored "previous-time" copy of a state/input/control/temporary
    /// variable, used by the RG/RC inductive-reachability optimizations.
    PreviousTime,
}

impl VarKind {
    pub const ALL: [VarKind; 7] = [
        VarKind::State,
        VarKind::NextState,
        VarKind::Uncontrollable,
        VarKind::Controllable,
        VarKind::Temporary,
        VarKind::TemplateParameter,
        VarKind::PreviousTime,
    ];

    pub fn index(self) -> usize {
        match self {
            VarKind::State => 0,
            VarKind::NextState => 1,
            VarKind::Uncontrollable => 2,
            VarKind::Controllable => 3,
            VarKind::Temporary => 4,
            VarKind::TemplateParameter => 5,
            VarKind::PreviousTime => 6,
        }
    }
}
