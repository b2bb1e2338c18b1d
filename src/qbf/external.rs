//! Out-of-process QBF backend (the `back_end = learning_qbf` / `ic3_style`
//! configurations' `qbf_solver = external`): writes QDIMACS to a temp
//! file, invokes a configured solver binary (e.g. DepQBF, matching the
//! original tool's `DepQBFApiInc.h`), and parses its result. Same
//! temp-file contract as [`crate::sat::ExternalSatSolver`] (§6).
#![cfg(feature = "external-solvers")]

use super::{Prefix, QbfSolver, QbfVerdict, Quantifier};
use crate::cnf::{Clause, Cnf, Cube, Literal};
use crate::error::{Error, Result};
use crate::vars::{VarId, VarStore};
use std::io::Write;
use std::process::Command;

pub struct ExternalQbfSolver {
    binary: std::path::PathBuf,
    tmp_dir: std::path::PathBuf,
    prefix_name: String,
    counter: u64,
    permanent: Cnf,
    prefix: Prefix,
}

impl ExternalQbfSolver {
    pub fn new(
        binary: impl Into<std::path::PathBuf>,
        tmp_dir: impl Into<std::path::PathBuf>,
        prefix_name: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            tmp_dir: tmp_dir.into(),
            prefix_name: prefix_name.into(),
            counter: 0,
            permanent: Cnf::new(),
            prefix: Prefix::new(),
        }
    }

    fn run(&mut self, prefix: &Prefix, cnf: &Cnf, vars: &VarStore, assumptions: &Cube) -> Result<(bool, Vec<Literal>)> {
        self.counter += 1;
        let path = self.tmp_dir.join(format!("{}-{}.qdimacs", self.prefix_name, self.counter));
        write_qdimacs(&path, prefix, cnf, vars, assumptions)?;

        let output = Command::new(&self.binary)
            .arg(&path)
            .output()
            .map_err(|e| Error::solver(format!("failed to invoke {:?}: {e}", self.binary)))?;
        let _ = std::fs::remove_file(&path);

        match output.status.code() {
            Some(10) => Ok((true, parse_model(&output.stdout))),
            Some(20) => Ok((false, parse_core(&output.stdout))),
            other => Err(Error::solver(format!(
                "external QBF solver returned unexpected exit code {other:?}"
            ))),
        }
    }
}

fn write_qdimacs(
    path: &std::path::Path,
    prefix: &Prefix,
    cnf: &Cnf,
    vars: &VarStore,
    assumptions: &Cube,
) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .map_err(|e| Error::resource(format!("temp file creation failed: {e}")))?;
    let max_var = cnf.clauses().iter().flat_map(|c| c.vars()).max().unwrap_or(0);
    writeln!(file, "p cnf {max_var} {}", cnf.len() + assumptions.literals().len())
        .map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
    for block in &prefix.0 {
        let tag = match block.quantifier {
            super::Quantifier::Exists => 'e',
            super::Quantifier::Forall => 'a',
        };
        let ids: Vec<String> = block
            .kinds
            .iter()
            .flat_map(|&k| vars.vars_of(k).iter().copied())
            .map(|v| v.to_string())
            .collect();
        if !ids.is_empty() {
            writeln!(file, "{tag} {} 0", ids.join(" "))
                .map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
        }
    }
    for clause in cnf.clauses() {
        for lit in clause.literals() {
            write!(file, "{} ", lit.raw()).map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
        }
        writeln!(file, "0").map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
    }
    for &lit in assumptions.literals() {
        writeln!(file, "{} 0", lit.raw()).map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
    }
    Ok(())
}

fn parse_model(stdout: &[u8]) -> Vec<Literal> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| l.starts_with('V') || l.starts_with('v'))
        .flat_map(|l| l.split_whitespace().skip(1))
        .filter_map(|t| t.parse::<i64>().ok())
        .filter(|&v| v != 0)
        .map(|v| Literal::signed(v.unsigned_abs() as VarId, v < 0))
        .collect()
}

fn parse_core(stdout: &[u8]) -> Vec<Literal> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| l.starts_with("c core"))
        .flat_map(|l| l.split_whitespace().skip(2))
        .filter_map(|t| t.parse::<i64>().ok())
        .map(|v| Literal::signed(v.unsigned_abs() as VarId, v < 0))
        .collect()
}

impl QbfSolver for ExternalQbfSolver {
    fn is_sat(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> bool {
        self.run(prefix, cnf, vars, &Cube::empty())
            .map(|(sat, _)| sat)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn is_sat_model(&mut self, vars: &mut VarStore, prefix: &Prefix, cnf: &Cnf) -> Option<Cube> {
        let (sat, model) = self
            .run(prefix, cnf, vars, &Cube::empty())
            .unwrap_or_else(|e| panic!("{e}"));
        if !sat {
            return None;
        }
        let outer = prefix
            .outermost()
            .filter(|b| b.quantifier == Quantifier::Exists)
            .map(|b| b.kinds.clone())
            .unwrap_or_default();
        let outer_vars: std::collections::HashSet<VarId> = outer
            .iter()
            .flat_map(|&k| vars.vars_of(k).iter().copied())
            .collect();
        Some(model.into_iter().filter(|l| outer_vars.contains(&l.var())).collect())
    }

    fn begin_inc(&mut self, prefix: &Prefix) {
        self.prefix = prefix.clone();
        self.permanent = Cnf::new();
    }

    fn inc_add_cnf(&mut self, cnf: &Cnf) {
        self.permanent.extend(cnf.clone());
    }

    fn inc_add_clause(&mut self, clause: Clause) {
        self.permanent.add(clause);
    }

    fn inc_sat_assumptions(&mut self, cube: &Cube) -> bool {
        let vars = VarStore::new();
        let cnf = self.permanent.clone();
        let prefix = self.prefix.clone();
        self.run(&prefix, &cnf, &vars, cube)
            .map(|(sat, _)| sat)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn inc_sat_model_or_core(&mut self, cube: &Cube) -> QbfVerdict {
        let vars = VarStore::new();
        let cnf = self.permanent.clone();
        let prefix = self.prefix.clone();
        let (sat, lits) = self.run(&prefix, &cnf, &vars, cube).unwrap_or_else(|e| panic!("{e}"));
        if sat {
            QbfVerdict::Sat(lits.into_iter().collect())
        } else {
            QbfVerdict::Unsat(lits.into_iter().filter(|l| cube.contains(*l)).collect())
        }
    }

    fn inc_push(&mut self) {
        // a conservative no-op-with-warning: the external QDIMACS binary
        // has no native incremental session; every call already replays
        // the full accumulated CNF (see `run`), so push/pop only need to
        // preserve their own clause-count bookkeeping, which `permanent`
        // does not currently track per-scope because no caller in this
        // crate nests QBF push/pop (only the SAT interface's do, §4.2 vs
        // §4.3's "optional incremental mode").
        log::debug!("ExternalQbfSolver::inc_push is a no-op; no native session to checkpoint");
    }

    fn inc_pop(&mut self) {
        log::debug!("ExternalQbfSolver::inc_pop is a no-op; no native session to restore");
    }
}
