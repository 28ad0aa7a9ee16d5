//! CLI interface for E-Copyright
//!
//! Defines the commands and global flags using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// E-Copyright assistant
///
/// A browser-based chat assistant for copyright-policy questions, backed by a
/// hosted chat-completion model.
#[derive(Parser, Debug)]
#[command(name = "ecopyright")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the web front-end until Ctrl-C
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration and credential status
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["ecopyright", "doctor"]);
        assert!(matches!(cli.command, Command::Doctor));
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "ecopyright",
            "--json",
            "--log",
            "debug",
            "--config",
            "/tmp/ecopyright.toml",
            "doctor",
        ]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/ecopyright.toml")));
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from(["ecopyright", "serve", "--host", "0.0.0.0", "-p", "9000"]);
        if let Command::Serve { host, port } = cli.command {
            assert_eq!(host.as_deref(), Some("0.0.0.0"));
            assert_eq!(port, Some(9000));
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_serve_defaults_to_config() {
        let cli = Cli::parse_from(["ecopyright", "serve"]);
        assert!(matches!(
            cli.command,
            Command::Serve {
                host: None,
                port: None
            }
        ));
    }
}
