//! ABC-style AIG rewriting as an optional external pass (§4.9's
//! "optionally post-optimized"; SPEC_FULL's `CNFImplExtractor.cpp`
//! `callExternalOptimizer` supplement). Operates on the fully embedded
//! AIG, after [`crate::aig::embed`] — never on the bare strategy — so the
//! function computed by the *whole* circuit is what the optimizer must
//! preserve. Same temp-file contract as the rest of §6's external
//! interfaces; never alters the function computed, only gate count.
#![cfg(feature = "external-solvers")]

use crate::aig::Aig;
use crate::error::{Error, Result};
use std::process::Command;

/// Round-trips `aig` through `binary` (e.g. an ABC `dc2`/`rewrite` script)
/// via a temp file pair under `tmp_dir`. On any non-zero exit or
/// unparseable output, returns the error untouched rather than silently
/// keeping the unoptimized circuit — §7 Solver error: "any non-zero/
/// unexpected code is fatal", no silent fallback.
pub fn optimize(aig: &Aig, binary: impl Into<std::path::PathBuf>, tmp_dir: impl Into<std::path::PathBuf>, prefix: &str) -> Result<Aig> {
    let binary = binary.into();
    let tmp_dir = tmp_dir.into();
    let in_path = tmp_dir.join(format!("{prefix}-optimize-in.aig"));
    let out_path = tmp_dir.join(format!("{prefix}-optimize-out.aig"));

    let file = std::fs::File::create(&in_path)
        .map_err(|e| Error::resource(format!("temp file creation failed: {e}")))?;
    crate::aig::write_binary(aig, file)?;

    let status = Command::new(&binary)
        .arg(&in_path)
        .arg(&out_path)
        .status()
        .map_err(|e| Error::solver(format!("failed to invoke AIG optimizer {binary:?}: {e}")))?;
    let _ = std::fs::remove_file(&in_path);

    match status.code() {
        Some(0) => {
            let file = std::fs::File::open(&out_path)
                .map_err(|e| Error::resource(format!("optimizer produced no output file: {e}")))?;
            let optimized = crate::aig::read(file)?;
            let _ = std::fs::remove_file(&out_path);
            Ok(optimized)
        }
        other => Err(Error::solver(format!(
            "external AIG optimizer returned unexpected exit code {other:?}"
        ))),
    }
}
