//! Out-of-process Skolem/Herbrand extraction: hands the negated synthesis
//! query off to a configured external binary (the real counterpart of
//! §4.9's "invokes an external Skolem/Herbrand-extraction pipeline") and
//! reads back a combinational AIG fragment. Same temp-file contract as
//! [`crate::sat::ExternalSatSolver`]/[`crate::qbf::ExternalQbfSolver`]
//! (§6): unique names per invocation, exit code checked, any unexpected
//! code fatal.
#![cfg(feature = "external-solvers")]

use super::StrategyExtractor;
use crate::aig::{AigLit, StrategyAig};
use crate::cnf::{Clause, Cnf, Literal};
use crate::error::{Error, Result};
use crate::spec::Model;
use crate::vars::VarStore;
use std::io::Write;
use std::process::Command;

/// Writes the synthesis query as QDIMACS-with-a-comment-header (matrix
/// `W(s) ∧ T(s,i,c,s′) ∧ ¬W(s′)`, the outermost-∃ `(s,i)` and the
/// universal `c` block named in `c` comment lines so the external tool
/// can tell inputs from the state/control signals it must extract
/// Skolem functions for), invokes `binary`, and parses back one AIGER
/// fragment line per controllable output: `<output-literal> <gate-count>`
/// followed by that many `<out> <a> <b>` AND-gate lines, matching the
/// original tool's own Skolem-extraction output convention.
pub struct ExternalExtractor {
    binary: std::path::PathBuf,
    tmp_dir: std::path::PathBuf,
    prefix: String,
    counter: u64,
}

impl ExternalExtractor {
    pub fn new(binary: impl Into<std::path::PathBuf>, tmp_dir: impl Into<std::path::PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            tmp_dir: tmp_dir.into(),
            prefix: prefix.into(),
            counter: 0,
        }
    }

    fn write_query(&self, path: &std::path::Path, model: &Model, w: &Cnf, vars: &mut VarStore) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .map_err(|e| Error::resource(format!("temp file creation failed: {e}")))?;

        let mut cnf = w.clone();
        cnf.extend(model.trans.clone());
        cnf.add(Clause::unit(Literal::positive(model.activation)));
        let w_next = w.rename(|v| model.present_to_next(v));
        let negated_w_next = w_next.negate(vars);
        cnf.extend(negated_w_next);

        let max_var = cnf.clauses().iter().flat_map(|c| c.vars()).max().unwrap_or(0);
        writeln!(file, "p cnf {max_var} {}", cnf.len())
            .map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
        writeln!(
            file,
            "c exists {}",
            model
                .state_vars
                .iter()
                .chain(model.uncontrollable_vars.iter())
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        )
        .ok();
        writeln!(
            file,
            "c forall {}",
            model.controllable_vars.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
        )
        .ok();
        for clause in cnf.clauses() {
            for lit in clause.literals() {
                write!(file, "{} ", lit.raw()).map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
            }
            writeln!(file, "0").map_err(|e| Error::resource(format!("temp file write failed: {e}")))?;
        }
        Ok(())
    }

    fn parse_result(&self, stdout: &[u8], expected_outputs: usize) -> Result<StrategyAig> {
        let text = String::from_utf8_lossy(stdout);
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| Error::solver("external extractor produced no output"))?;
        let mut header_fields = header.split_whitespace();
        let max_var: u32 = header_fields
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Error::solver("malformed extractor output header"))?;

        let mut ands = Vec::new();
        let mut outputs = Vec::new();
        for line in lines {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.len() {
                1 => {
                    let out: AigLit = fields[0]
                        .parse()
                        .map_err(|_| Error::solver("malformed extractor output line"))?;
                    outputs.push(out);
                }
                3 => {
                    let parse = |s: &str| -> Result<AigLit> {
                        s.parse().map_err(|_| Error::solver("malformed extractor gate line"))
                    };
                    ands.push((parse(fields[0])?, parse(fields[1])?, parse(fields[2])?));
                }
                0 => {}
                _ => return Err(Error::solver("malformed extractor output line")),
            }
        }
        if outputs.len() != expected_outputs {
            return Err(Error::solver(format!(
                "external extractor produced {} outputs, expected {expected_outputs}",
                outputs.len()
            )));
        }
        Ok(StrategyAig { ands, outputs, max_var })
    }
}

impl StrategyExtractor for ExternalExtractor {
    fn extract(&mut self, vars: &mut VarStore, model: &Model, w: &Cnf) -> Result<StrategyAig> {
        self.counter += 1;
        let path = self.tmp_dir.join(format!("{}-{}.qdimacs", self.prefix, self.counter));
        self.write_query(&path, model, w, vars)?;

        let output = Command::new(&self.binary)
            .arg(&path)
            .output()
            .map_err(|e| Error::solver(format!("failed to invoke {:?}: {e}", self.binary)))?;
        let _ = std::fs::remove_file(&path);

        match output.status.code() {
            Some(0) => self.parse_result(&output.stdout, model.controllable_vars.len()),
            other => Err(Error::solver(format!(
                "external extraction pipeline returned unexpected exit code {other:?}"
            ))),
        }
    }
}
