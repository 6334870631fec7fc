//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Asset build pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the cwd (default: assetkit.toml)
    #[arg(short = 'C', long, global = true, default_value = "assetkit.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Dump every configured asset to the web root once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// List eager assets and lazy formulae
    #[command(visible_alias = "l")]
    List,

    /// Serve the web root, dumping assets after every request
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not dump assets after requests
        #[arg(long)]
        no_auto_dump: bool,

        /// Enable verbose output for debugging
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Build command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Debug mode: drop `?optional` filters and bypass the compiled cache
    #[arg(short, long)]
    pub debug: bool,

    /// Disable the compiled cache for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub const fn is_verbose(&self) -> bool {
        match &self.command {
            Commands::Build { build_args } => build_args.verbose,
            Commands::Serve { verbose, .. } => *verbose,
            Commands::List => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_flags() {
        let cli = Cli::parse_from(["assetkit", "build", "--debug", "--no-cache", "-v"]);
        let Commands::Build { build_args } = &cli.command else {
            panic!("expected build");
        };
        assert!(build_args.debug);
        assert!(build_args.no_cache);
        assert!(cli.is_verbose());
        assert_eq!(cli.config, PathBuf::from("assetkit.toml"));
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from([
            "assetkit",
            "-C",
            "conf/assets.toml",
            "serve",
            "-i",
            "0.0.0.0",
            "-p",
            "9000",
            "--no-auto-dump",
        ]);
        let Commands::Serve {
            interface,
            port,
            no_auto_dump,
            verbose,
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(interface, Some("0.0.0.0".parse().unwrap()));
        assert_eq!(port, Some(9000));
        assert!(no_auto_dump);
        assert!(!verbose);
        assert_eq!(cli.config, PathBuf::from("conf/assets.toml"));
    }

    #[test]
    fn test_alias() {
        let cli = Cli::parse_from(["assetkit", "l"]);
        assert!(matches!(cli.command, Commands::List));
    }
}
