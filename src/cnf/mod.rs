//! Clause-set algebra over the variables of [`crate::vars`] (§3, §4.1).

mod clause;
#[allow(clippy::module_inception)]
mod cnf;
mod literal;
mod tseitin;

pub use clause::{Clause, Cube};
pub use cnf::Cnf;
pub use literal::Literal;
