//! Thin CLI shell: parses `config::Options`, initializes logging, runs
//! `resyn::run::execute`, and maps the result to a process exit code
//! (§6's exit-code table; §7's propagation policy — everything not an
//! oracle-level failure is reported here, at the entry point).

use clap::Parser;
use colored::Colorize;
use resyn::config::Options;

/// Exit codes of §6 are reserved verdicts, not errors; everything else
/// prints in the teacher's CLI color scheme (green success, red failure).
fn report(code: i32) {
    match code {
        10 => eprintln!("{}", "realizable".green().bold()),
        20 => eprintln!("{}", "unrealizable".yellow().bold()),
        _ => {}
    }
}

fn main() {
    let options = Options::parse();
    resyn::init(options.log_level());

    match resyn::run::execute(&options) {
        Ok(code) => {
            report(code);
            std::process::exit(code);
        }
        Err(err) => {
            log::error!("{}", err.to_string().red());
            std::process::exit(err.exit_code());
        }
    }
}
