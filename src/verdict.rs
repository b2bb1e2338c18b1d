use crate::cnf::Cnf;

/// The outcome every back end (`learn`, `ic3`, `parallel`) produces (§3's
/// "winning region", §7: "Unrealizable. A normal outcome, not an error").
/// `Unrealizable` is carried here, never as an `Err`.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// The winning region `W`, satisfying Testable Property 4's
    /// post-verification invariants.
    Realizable(Cnf),
    Unrealizable,
}

impl Verdict {
    pub fn is_realizable(&self) -> bool {
        matches!(self, Verdict::Realizable(_))
    }

    /// §6's exit-code table: 10 = realizable, 20 = unrealizable.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Realizable(_) => 10,
            Verdict::Unrealizable => 20,
        }
    }
}
