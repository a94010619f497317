// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::Parser;
use clap::error::ErrorKind;

/// Command-line arguments for `rerun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rerun",
    version,
    about = "Re-run a shell command whenever files under the current directory change.",
    long_about = None
)]
pub struct CliArgs {
    /// Enable debug logging (must come before the command).
    #[arg(long)]
    pub debug: bool,

    /// The command to run. All words are joined with single spaces and handed
    /// to the shell, so pipes and redirects work when quoted.
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl CliArgs {
    /// The shell command line, positional words joined by single spaces.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

/// Parse `std::env::args`.
///
/// Usage errors (including a missing command) exit with status 1; `--help`
/// and `--version` keep clap's behaviour.
pub fn parse() -> CliArgs {
    match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_positional_words_with_single_spaces() {
        let args = CliArgs::try_parse_from(["rerun", "cargo", "test", "--", "--nocapture"]).unwrap();
        assert!(!args.debug);
        assert_eq!(args.command_line(), "cargo test -- --nocapture");
    }

    #[test]
    fn leading_debug_flag_enables_debug() {
        let args = CliArgs::try_parse_from(["rerun", "--debug", "make", "-j4"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.command_line(), "make -j4");
    }

    #[test]
    fn debug_after_command_is_part_of_the_command() {
        let args = CliArgs::try_parse_from(["rerun", "ls", "--debug"]).unwrap();
        assert!(!args.debug);
        assert_eq!(args.command_line(), "ls --debug");
    }

    #[test]
    fn missing_command_is_an_error() {
        assert!(CliArgs::try_parse_from(["rerun"]).is_err());
        assert!(CliArgs::try_parse_from(["rerun", "--debug"]).is_err());
    }
}
