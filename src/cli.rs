//! CLI definitions for keeld.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keel daemon CLI.
#[derive(Parser)]
#[command(name = "keeld")]
#[command(about = "Daemon host for Keel applications")]
#[command(version)]
pub(crate) struct Cli {
    /// PID file path
    #[arg(long, global = true)]
    pub pid_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the daemon process
    Start {
        /// Run in foreground (don't detach from the terminal)
        #[arg(long)]
        foreground: bool,

        /// Configuration file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Named KEY=VALUE argument forwarded to the application
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,

        /// Positional arguments forwarded to the application
        args: Vec<String>,
    },

    /// Stop the daemon process
    Stop,

    /// Restart the daemon process
    Restart {
        /// Configuration file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Named KEY=VALUE argument forwarded to the application
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,

        /// Positional arguments forwarded to the application
        args: Vec<String>,
    },

    /// Report daemon status
    Status {
        /// Also probe the OS for process liveness
        #[arg(long)]
        live: bool,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))?;
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_start_arguments() {
        let cli = Cli::try_parse_from([
            "keeld",
            "start",
            "--foreground",
            "--var",
            "interval=5",
            "alpha",
            "beta",
        ])
        .unwrap();

        match cli.command {
            Command::Start {
                foreground,
                vars,
                args,
                ..
            } => {
                assert!(foreground);
                assert_eq!(vars, vec![("interval".to_string(), "5".to_string())]);
                assert_eq!(args, vec!["alpha".to_string(), "beta".to_string()]);
            }
            _ => panic!("expected start command"),
        }
    }

    #[test]
    fn test_global_pid_file() {
        let cli = Cli::try_parse_from(["keeld", "stop", "--pid-file", "/tmp/x.pid"]).unwrap();
        assert_eq!(cli.pid_file, Some(PathBuf::from("/tmp/x.pid")));
    }

    #[test]
    fn test_var_requires_equals() {
        assert!(Cli::try_parse_from(["keeld", "start", "--var", "broken"]).is_err());
    }
}
