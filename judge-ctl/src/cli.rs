use clap::{Args, Parser, Subcommand, ValueEnum};
use judge_checker::{ComparisonPolicy, DEFAULT_DEBUG_MARKER};
use std::path::PathBuf;

use crate::templates::Template;

#[derive(Parser)]
#[command(name = "judge-ctl")]
#[command(version, about = "Run submissions against test cases and report verdicts", long_about = None)]
#[command(after_help = "EXAMPLES:
    # One-off evaluation
    judge-ctl run --input 1.in --expected 1.out ./solution
    judge-ctl run --input 2.in --expected 2.out --checker tolerance --abs-eps 1e-4 python3 sol.py

    # Test-set workflow
    judge-ctl init
    judge-ctl add-set Sum --template java
    judge-ctl add-test Sum --input sum1.in --output sum1.out
    judge-ctl test Sum -t 1-3,5
    judge-ctl cat Sum 2 --in
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory holding the .judge store
    #[arg(short = 'C', long, value_name = "DIR", global = true, default_value = ".")]
    pub root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CheckerKind {
    /// Whitespace-separated tokens must match exactly
    Exact,
    /// Trimmed lines must match; layout-only differences are presentation errors
    Lines,
    /// Tokens compared as numbers within an absolute or relative error
    Tolerance,
}

#[derive(Args, Debug, Clone)]
pub struct CheckerArgs {
    /// Comparison policy
    #[arg(long, value_enum, default_value_t = CheckerKind::Exact)]
    pub checker: CheckerKind,

    /// Absolute error bound for the tolerance checker
    #[arg(long, value_name = "EPS", default_value_t = 1e-6)]
    pub abs_eps: f64,

    /// Relative error bound for the tolerance checker
    #[arg(long, value_name = "EPS", default_value_t = 1e-6)]
    pub rel_eps: f64,

    /// Output lines starting with this marker are debug output and never graded
    #[arg(long, value_name = "MARKER", default_value = DEFAULT_DEBUG_MARKER)]
    pub debug_marker: String,
}

impl CheckerArgs {
    pub fn policy(&self) -> ComparisonPolicy {
        match self.checker {
            CheckerKind::Exact => ComparisonPolicy::ExactToken,
            CheckerKind::Lines => ComparisonPolicy::Lines,
            CheckerKind::Tolerance => ComparisonPolicy::tolerance(self.abs_eps, self.rel_eps),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate one program against one input/expected-output pair
    Run {
        /// File fed to the program's stdin
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// File holding the expected output
        #[arg(long, value_name = "FILE")]
        expected: PathBuf,

        /// Wall-clock limit in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 2000)]
        time: u64,

        /// Memory limit (64M, 1G)
        #[arg(long, value_name = "SIZE", default_value = "256M")]
        memory: String,

        #[command(flatten)]
        checker: CheckerArgs,

        /// Program to run
        program: String,

        /// Program arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Create the .judge store in the project directory
    Init {
        /// Reset an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Add a test set
    AddSet {
        /// Test set name; replaces {name} in scripts
        name: String,

        /// Language template supplying default limits and scripts
        #[arg(short = 'T', long, value_enum, default_value_t = Template::None)]
        template: Template,

        /// Wall-clock limit in milliseconds
        #[arg(long, value_name = "MS")]
        time: Option<u64>,

        /// Memory limit (64M, 1G)
        #[arg(long, value_name = "SIZE")]
        memory: Option<String>,

        /// Shell script run once before the tests
        #[arg(long, value_name = "SCRIPT")]
        compile: Option<String>,

        /// Command line of the submission
        #[arg(long, value_name = "COMMAND")]
        run: Option<String>,

        /// Shell script run once after the tests
        #[arg(long, value_name = "SCRIPT")]
        cleanup: Option<String>,

        #[command(flatten)]
        checker: CheckerArgs,
    },

    /// Store a test case under the next free number
    AddTest {
        /// Test set name
        set: String,

        /// Input file
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Expected output file
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print a stored test case
    Cat {
        /// Test set name
        set: String,

        /// Test number
        number: u32,

        /// Only show the input
        #[arg(short = 'i', long = "in", conflicts_with = "output_only")]
        input_only: bool,

        /// Only show the expected output
        #[arg(short = 'o', long = "out")]
        output_only: bool,
    },

    /// Run a test set
    Test {
        /// Test set name
        set: String,

        /// Tests to run, e.g. 1-3,5 (all when omitted)
        #[arg(short, long, value_name = "TESTS")]
        tests: Option<String>,
    },

    /// List test set templates
    Templates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_checker_flags() {
        let cli = Cli::try_parse_from([
            "judge-ctl",
            "run",
            "--input",
            "1.in",
            "--expected",
            "1.out",
            "--checker",
            "tolerance",
            "--abs-eps",
            "1e-4",
            "./sol",
            "--fast",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                checker,
                program,
                args,
                time,
                ..
            } => {
                assert_eq!(checker.policy(), ComparisonPolicy::tolerance(1e-4, 1e-6));
                assert_eq!(program, "./sol");
                assert_eq!(args, vec!["--fast"]);
                assert_eq!(time, 2000);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn cat_rejects_both_filters() {
        let result = Cli::try_parse_from(["judge-ctl", "cat", "Sum", "1", "--in", "--out"]);
        assert!(result.is_err());
    }

    #[test]
    fn add_set_defaults() {
        let cli = Cli::try_parse_from(["judge-ctl", "add-set", "Sum", "--run", "./sum"]).unwrap();
        match cli.command {
            Commands::AddSet {
                template, checker, ..
            } => {
                assert_eq!(template, Template::None);
                assert_eq!(checker.policy(), ComparisonPolicy::ExactToken);
                assert_eq!(checker.debug_marker, "#");
            }
            _ => panic!("expected add-set"),
        }
    }
}
