//! The specification model: turns a parsed AIG into the propositional
//! building blocks every solving engine shares (§3).

mod model;

pub use model::Model;
