use thiserror::Error;

/// The four non-overlapping error kinds of §7. `Unrealizable` is deliberately
/// absent: it is a normal outcome carried by [`crate::verdict::Verdict`], not
/// a failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed AIG, zero controllable inputs, multiple outputs, a
    /// non-zero latch reset.
    #[error("input error: {0}")]
    Input(String),

    /// External solver missing, crashed, or returned "unknown". Never
    /// silently falls back.
    #[error("solver error: {0}")]
    Solver(String),

    /// Expansion budget exceeded or temp-file creation failed. The
    /// expansion-budget case is caught by the caller (see
    /// [`crate::expand::expand`]); everything else surfaces here.
    #[error("resource error: {0}")]
    Resource(String),

    /// An internal invariant did not hold (frame monotonicity, cube
    /// well-formedness, registry consistency). Fatal in debug builds;
    /// `debug_assert!`-gated so release builds do not pay for the check.
    #[error("logic error: {0}")]
    Logic(String),
}

impl Error {
    pub fn input(msg: impl Into<String>) -> Self {
        Error::Input(msg.into())
    }
    pub fn solver(msg: impl Into<String>) -> Self {
        Error::Solver(msg.into())
    }
    pub fn resource(msg: impl Into<String>) -> Self {
        Error::Resource(msg.into())
    }
    pub fn logic(msg: impl Into<String>) -> Self {
        Error::Logic(msg.into())
    }

    /// Process exit code per §6: 10/20 are reserved for realizability
    /// verdicts and are never produced here; anything else is an internal
    /// error and maps to a non-zero, non-reserved code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Input(_) => 1,
            Error::Solver(_) => 2,
            Error::Resource(_) => 3,
            Error::Logic(_) => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
