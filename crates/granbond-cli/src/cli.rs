use clap::{Args, Parser, Subcommand, ValueEnum};
use granbond::core::contact::neighbor::ListKind;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "granbond developers",
    version,
    about = "granbond CLI - Evaluate cohesive, breakable-bond contact forces for granular particle snapshots.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve and print the material parameters of a configuration.
    Validate(ValidateArgs),
    /// Form bonds in a particle snapshot and evaluate contact forces for a number of steps.
    Evaluate(EvaluateArgs),
    /// Write or inspect binary restart settings.
    Restart(RestartArgs),
}

/// Configuration sources shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Material parameters as nine tokens: "kn kt gn gt mu damp t c enlarge".
    /// `kt` and `gt` may be NULL to use their defaults. Replaces the [material] table.
    #[arg(long, value_name = "TOKENS")]
    pub style: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S simulation.timestep=1e-5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Neighbor-list convention used by `evaluate`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKindArg {
    /// Each pair once; the partner receives the reaction force.
    Half,
    /// Each particle lists all partners; forces go to the owner only.
    Full,
}

impl From<ListKindArg> for ListKind {
    fn from(value: ListKindArg) -> Self {
        match value {
            ListKindArg::Half => ListKind::Half,
            ListKindArg::Full => ListKind::Full,
        }
    }
}

/// Arguments for the `evaluate` subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Path to the input particle snapshot (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the per-particle force and torque output (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Also write per-contact diagnostics of every step to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub contacts: Option<PathBuf>,

    /// Write the particle snapshot after the last step to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub final_state: Option<PathBuf>,

    /// Override the number of evaluation steps.
    #[arg(short = 'n', long, value_name = "INT")]
    pub steps: Option<usize>,

    /// Override the timestep.
    #[arg(short = 't', long, value_name = "FLOAT")]
    pub timestep: Option<f64>,

    /// Override the neighbor-list convention.
    #[arg(long, value_enum, value_name = "KIND")]
    pub list: Option<ListKindArg>,
}

/// Arguments for the `restart` subcommand.
#[derive(Args, Debug)]
pub struct RestartArgs {
    #[command(subcommand)]
    pub command: RestartCommands,
}

#[derive(Subcommand, Debug)]
pub enum RestartCommands {
    /// Write the restart settings of a configuration.
    Write {
        #[command(flatten)]
        config: ConfigArgs,

        /// Destination of the binary restart settings.
        #[arg(short, long, required = true, value_name = "PATH")]
        output: PathBuf,
    },
    /// Print the contents of a restart settings file.
    Show {
        /// The restart settings file to read.
        #[arg(required = true)]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_arguments_parse_with_repeated_overrides() {
        let cli = Cli::try_parse_from([
            "granbond",
            "-vv",
            "evaluate",
            "-c",
            "cfg.toml",
            "-i",
            "in.csv",
            "-o",
            "out.csv",
            "--list",
            "full",
            "-S",
            "simulation.steps=3",
            "-S",
            "material.friction-coefficient=0.4",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Evaluate(args) = cli.command else {
            panic!("expected evaluate");
        };
        assert_eq!(args.list, Some(ListKindArg::Full));
        assert_eq!(args.config.set_values.len(), 2);
        assert_eq!(ListKind::from(args.list.unwrap()), ListKind::Full);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["granbond", "-q", "-v", "validate"]).is_err());
    }

    #[test]
    fn restart_show_requires_a_path() {
        assert!(Cli::try_parse_from(["granbond", "restart", "show"]).is_err());
        assert!(Cli::try_parse_from(["granbond", "restart", "show", "state.bin"]).is_ok());
    }
}
