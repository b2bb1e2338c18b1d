//! Out-of-process SAT backend: writes DIMACS CNF to a temp file, invokes a
//! configured solver binary, and parses its result line and model/core
//! output. Matches §6's external-solver contract (temp files in a
//! configurable directory, unique names across concurrent workers, exit
//! code read via `WEXITSTATUS`, any unexpected code fatal) and §9's "one
//! concrete implementation per backend".
#![cfg(feature = "external-solvers")]

use super::{minimize_core, SatSolver, SatVerdict, SolverState};
use crate::cnf::{Clause, Cnf, Cube, Literal};
use crate::error::{Error, Result};
use crate::vars::VarId;
use std::collections::HashSet;
use std::io::Write;
use std::process::Command;

/// Shells out to `binary` for every solve; there is no real interprocess
/// incremental mode available for an arbitrary DIMACS-speaking solver, so
/// the incremental session is simulated in-process (same approach as
/// [`super::InProcessSatSolver`]) with every `inc_sat*` replaying the full
/// accumulated CNF to a fresh process. This keeps the same external-binary
/// contract for the one-shot `solve`/`solve_model` entry points while still
/// satisfying the incremental trait.
pub struct ExternalSatSolver {
    binary: std::path::PathBuf,
    tmp_dir: std::path::PathBuf,
    prefix: String,
    state: SolverState,
    minimize_cores: bool,
    permanent: Cnf,
    push_marks: Vec<usize>,
    counter: u64,
}

impl ExternalSatSolver {
    pub fn new(binary: impl Into<std::path::PathBuf>, tmp_dir: impl Into<std::path::PathBuf>, prefix: impl Into<String>, minimize_cores: bool) -> Self {
        Self {
            binary: binary.into(),
            tmp_dir: tmp_dir.into(),
            prefix: prefix.into(),
            state: SolverState::Idle,
            minimize_cores,
            permanent: Cnf::new(),
            push_marks: Vec::new(),
            counter: 0,
        }
    }

    fn run(&mut self, cnf: &Cnf, assumptions: &Cube) -> Result<(bool, Vec<Literal>)> {
        self.counter += 1;
        let path = self
            .tmp_dir
            .join(format!("{}-{}.cnf", self.prefix, self.counter));
        write_dimacs(&path, cnf, assumptions)?;

        let output = Command::new(&self.binary)
            .arg(&path)
            .output()
            .map_err(|e| Error::solver(format!("failed to invoke {:?}: {e}", self.binary)))?;
        let _ = std::fs::remove_file(&path);

        // DIMACS convention: exit code 10 = SAT, 20 = UNSAT (mirrors §6's
        // exit-code table at the crate's own outer boundary).
        match output.status.code() {
            Some(10) => Ok((true, parse_dimacs_model(&output.stdout))),
            Some(20) => Ok((false, parse_dimacs_core(&output.stdout))),
            other => Err(Error::solver(format!(
                "external SAT solver returned unexpected exit code {other:?}"
            ))),
        }
    }
}

fn write_dimacs(path: &std::path::Path, cnf: &Cnf, assumptions: &Cube) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .map_err(|e| Error::resource(format!("temp file creation failed: {e}")))?;
    let total_clauses = cnf.clauses().len() + assumptions.literals().len();
    let max_var = cnf
        .clauses()
        .iter()
        .flat_map(|c| c.vars())
        .chain(assumptions.vars())
        .max()
        .unwrap_or(0);
    writeln!(file, "p cnf {max_var} {total_clauses}")
        .map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
    for clause in cnf.clauses() {
        write_clause_line(&mut file, clause.literals())?;
    }
    for &lit in assumptions.literals() {
        write_clause_line(&mut file, &[lit])?;
    }
    Ok(())
}

fn write_clause_line(file: &mut std::fs::File, lits: &[Literal]) -> Result<()> {
    for lit in lits {
        write!(file, "{} ", lit.raw()).map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
    }
    writeln!(file, "0").map_err(|e| Error::resource(format!("temp file write failed: {e}")))
}

fn parse_dimacs_model(stdout: &[u8]) -> Vec<Literal> {
    let text = String::from_utf8_lossy(stdout);
    text.lines()
        .filter(|l| l.starts_with('v'))
        .flat_map(|l| l.split_whitespace().skip(1))
        .filter_map(|tok| tok.parse::<i64>().ok())
        .filter(|&v| v != 0)
        .map(|v| Literal::signed(v.unsigned_abs() as VarId, v < 0))
        .collect()
}

fn parse_dimacs_core(stdout: &[u8]) -> Vec<Literal> {
    // non-standard but common convention: a line starting with 'c core'
    // lists the failed assumption literals.
    let text = String::from_utf8_lossy(stdout);
    text.lines()
        .filter(|l| l.starts_with("c core"))
        .flat_map(|l| l.split_whitespace().skip(2))
        .filter_map(|tok| tok.parse::<i64>().ok())
        .map(|v| Literal::signed(v.unsigned_abs() as VarId, v < 0))
        .collect()
}

impl SatSolver for ExternalSatSolver {
    fn solve(&mut self, cnf: &Cnf) -> bool {
        self.run(cnf, &Cube::empty())
            .map(|(sat, _)| sat)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn solve_model(&mut self, cnf: &Cnf, relevant: &[VarId]) -> Option<Cube> {
        let (sat, model) = self.run(cnf, &Cube::empty()).unwrap_or_else(|e| panic!("{e}"));
        if !sat {
            return None;
        }
        let relevant_set: HashSet<VarId> = relevant.iter().copied().collect();
        Some(model.into_iter().filter(|l| relevant_set.contains(&l.var())).collect())
    }

    fn begin_inc(&mut self, _keep: &[VarId], _randomize_models: bool) {
        self.state = SolverState::IncrementalOpen;
        self.permanent = Cnf::new();
        self.push_marks.clear();
    }

    fn inc_add_clause(&mut self, clause: Clause) {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_add_clause before begin_inc");
        self.permanent.add(clause);
    }

    fn inc_add_cnf(&mut self, cnf: &Cnf) {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_add_cnf before begin_inc");
        self.permanent.extend(cnf.clone());
    }

    fn inc_add_cube(&mut self, cube: &Cube) {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_add_cube before begin_inc");
        self.permanent.add_cube_as_clauses(cube);
    }

    fn inc_add_neg_cube(&mut self, cube: &Cube) {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_add_neg_cube before begin_inc");
        self.permanent.add_neg_cube(cube);
    }

    fn inc_push(&mut self) {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_push before begin_inc");
        self.push_marks.push(self.permanent.len());
    }

    fn inc_pop(&mut self) {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_pop before begin_inc");
        let mark = self.push_marks.pop().expect("inc_pop without matching inc_push");
        let kept: Vec<_> = self.permanent.clauses()[..mark].to_vec();
        let mut rebuilt = Cnf::new();
        for clause in kept {
            rebuilt.add(clause);
        }
        self.permanent = rebuilt;
    }

    fn inc_sat(&mut self, assumptions: &Cube) -> bool {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_sat before begin_inc");
        let cnf = self.permanent.clone();
        self.run(&cnf, assumptions).map(|(sat, _)| sat).unwrap_or_else(|e| panic!("{e}"))
    }

    fn inc_sat_model_or_core(
        &mut self,
        assumption_cube: &Cube,
        split: &Cube,
        relevant: &[VarId],
    ) -> SatVerdict {
        assert_eq!(self.state, SolverState::IncrementalOpen, "inc_sat_model_or_core before begin_inc");
        let mut assumps = assumption_cube.literals().to_vec();
        assumps.extend(split.literals().iter().copied());
        let full_assumptions: Cube = assumps.into_iter().collect();
        let cnf = self.permanent.clone();
        let (sat, lits) = self.run(&cnf, &full_assumptions).unwrap_or_else(|e| panic!("{e}"));
        if sat {
            let relevant_set: HashSet<VarId> = relevant.iter().copied().collect();
            SatVerdict::Sat(lits.into_iter().filter(|l| relevant_set.contains(&l.var())).collect())
        } else {
            let core_in_cube: Cube = lits
                .into_iter()
                .filter(|l| assumption_cube.contains(*l))
                .collect();
            let core = if self.minimize_cores {
                let cnf = self.permanent.clone();
                minimize_core(core_in_cube, |candidate| {
                    self.run(&cnf, candidate).map(|(sat, _)| !sat).unwrap_or(true)
                })
            } else {
                core_in_cube
            };
            SatVerdict::Unsat(core)
        }
    }

    fn state(&self) -> SolverState {
        self.state
    }
}
