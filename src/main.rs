//! assetkit command-line entry point.

use anyhow::Result;
use assetkit::cli::{Cli, Commands, build, list, serve};
use assetkit::config::PipelineConfig;
use assetkit::logger;
use clap::{ColorChoice, Parser};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.is_verbose());

    let mut config = PipelineConfig::load(&cli.config)?;

    match &cli.command {
        Commands::Build { build_args } => {
            build::apply_overrides(&mut config, build_args);
            build::build_assets(&config)
        }
        Commands::List => list::list_assets(&config),
        Commands::Serve {
            interface,
            port,
            no_auto_dump,
            ..
        } => {
            if let Some(interface) = interface {
                config.serve.interface = *interface;
            }
            if let Some(port) = port {
                config.serve.port = *port;
            }
            if *no_auto_dump {
                config.options.auto_dump_assets = false;
            }
            serve::serve_assets(&config)
        }
    }
}
