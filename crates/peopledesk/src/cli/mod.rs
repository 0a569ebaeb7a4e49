//! Command-line interface for peopledesk.
//!
//! This module provides the CLI structure for the `pdesk` binary and the
//! interactive shell it can start.

mod commands;
pub mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, ConfigCommand, DeleteCommand, EditCommand, ListCommand, OutputFormat,
    ShowCommand,
};

/// pdesk - Manage a remote people directory
///
/// Lists, searches, creates, edits and deletes people records kept by a
/// REST service, either one command at a time or from an interactive shell.
#[derive(Debug, Parser)]
#[command(name = "pdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Base URL of the people resource (overrides configuration)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List people
    List(ListCommand),

    /// Show one person
    Show(ShowCommand),

    /// Create a person
    Add(AddCommand),

    /// Change a person's name or age
    Edit(EditCommand),

    /// Delete a person
    Delete(DeleteCommand),

    /// Start the interactive shell
    Shell,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            base_url: None,
            command: Command::Shell,
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "pdesk");
    }

    #[test]
    fn test_verbosity_quiet() {
        assert_eq!(cli(0, true).verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_normal() {
        assert_eq!(cli(0, false).verbosity(), crate::logging::Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_verbose() {
        assert_eq!(cli(1, false).verbosity(), crate::logging::Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_trace() {
        assert_eq!(cli(2, false).verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from(["pdesk", "list", "--search", "ana", "-f", "json"]).unwrap();
        let Command::List(list) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(list.search.as_deref(), Some("ana"));
        assert_eq!(list.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_list_defaults_to_table() {
        let cli = Cli::try_parse_from(["pdesk", "list"]).unwrap();
        let Command::List(list) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(list.format, OutputFormat::Table);
        assert!(list.search.is_none());
    }

    #[test]
    fn test_parse_add() {
        let cli =
            Cli::try_parse_from(["pdesk", "add", "--name", "Ana", "--dni", "1", "--age", "30"])
                .unwrap();
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.name, "Ana");
        assert_eq!(add.dni, "1");
        assert_eq!(add.age, "30");
    }

    #[test]
    fn test_parse_add_negative_age_reaches_validation() {
        let cli = Cli::try_parse_from(["pdesk", "add", "-n", "Ana", "-d", "1", "-a", "-1"]).unwrap();
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.age, "-1");
    }

    #[test]
    fn test_parse_edit() {
        let cli = Cli::try_parse_from(["pdesk", "edit", "1", "--age", "31"]).unwrap();
        let Command::Edit(edit) = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(edit.dni, "1");
        assert!(edit.name.is_none());
        assert_eq!(edit.age.as_deref(), Some("31"));
    }

    #[test]
    fn test_parse_delete() {
        let cli = Cli::try_parse_from(["pdesk", "delete", "1", "--yes"]).unwrap();
        assert!(matches!(cli.command, Command::Delete(DeleteCommand { yes: true, .. })));
    }

    #[test]
    fn test_parse_shell() {
        let cli = Cli::try_parse_from(["pdesk", "shell"]).unwrap();
        assert!(matches!(cli.command, Command::Shell));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::try_parse_from(["pdesk", "config", "validate", "--file", "x.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["pdesk", "-c", "/custom/config.toml", "list"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_base_url() {
        let cli =
            Cli::try_parse_from(["pdesk", "list", "--base-url", "http://api.test/people"]).unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://api.test/people"));
    }

    #[test]
    fn test_parse_with_verbose() {
        let cli = Cli::try_parse_from(["pdesk", "-v", "list"]).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_parse_with_quiet() {
        let cli = Cli::try_parse_from(["pdesk", "-q", "list"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_requires_dni_for_show() {
        assert!(Cli::try_parse_from(["pdesk", "show"]).is_err());
    }
}
