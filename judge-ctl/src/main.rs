//! Judge controller CLI - Grade submissions against stored test sets

mod cli;
mod commands;
mod logging;
mod runner;
mod store;
mod templates;

use clap::Parser;
use cli::{Cli, Commands};
use commands::list_templates;
use console::style;
use judge_core::{Limits, Result};
use templates::SetOptions;

fn dispatch(cli: Cli) -> Result<bool> {
    let root = cli.root;

    match cli.command {
        Commands::Run {
            input,
            expected,
            time,
            memory,
            checker,
            program,
            args,
        } => {
            let limits = Limits::parse(time, &memory)?;
            commands::run_single(
                program,
                args,
                &input,
                &expected,
                limits,
                checker.policy(),
                &checker.debug_marker,
            )
        }
        Commands::Init { force } => commands::init(&root, force).map(|_| true),
        Commands::AddSet {
            name,
            template,
            time,
            memory,
            compile,
            run,
            cleanup,
            checker,
        } => {
            let options = SetOptions {
                time_ms: time,
                memory,
                compile,
                run,
                cleanup,
                checker: checker.policy(),
                debug_marker: checker.debug_marker,
            };
            commands::add_set(&root, &name, template, options).map(|_| true)
        }
        Commands::AddTest { set, input, output } => {
            commands::add_test(&root, &set, &input, &output).map(|_| true)
        }
        Commands::Cat {
            set,
            number,
            input_only,
            output_only,
        } => commands::cat(&root, &set, number, input_only, output_only).map(|_| true),
        Commands::Test { set, tests } => commands::test(&root, &set, tests.as_deref()),
        Commands::Templates => {
            list_templates();
            Ok(true)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    match dispatch(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_templates_runs() {
        list_templates();
    }

    #[test]
    fn run_rejects_bad_memory_before_launching() {
        let cli = Cli::try_parse_from([
            "judge-ctl",
            "run",
            "--input",
            "/nonexistent.in",
            "--expected",
            "/nonexistent.out",
            "--memory",
            "lots",
            "/bin/true",
        ])
        .unwrap();
        assert!(dispatch(cli).is_err());
    }
}
