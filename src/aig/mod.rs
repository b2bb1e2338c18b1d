//! And-inverter graph representation and AIGER I/O (§6). Parsing/writing is
//! explicitly out of core scope per §1 ("treated as external collaborators
//! with minimal interfaces"); this module is the thin, self-contained
//! implementation of that interface the rest of the crate consumes.

mod embed;
mod graph;
mod io;

pub use embed::{embed, StrategyAig};
pub use graph::{is_negated, negate, var_of, AigLit, AndGate, Latch, Aig, FALSE, TRUE};
pub use io::{read, write_ascii, write_binary};
