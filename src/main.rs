use anyhow::Result;
use clap::Parser;
use multisteg::cli::{CommandLineHandler, CommandLineInterface};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let command_line_interface = CommandLineInterface::parse();

    // RUST_LOG wins over the -v flag
    let default_directive = if command_line_interface.verbose {
        "debug"
    } else {
        "info"
    };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut cli_handler = CommandLineHandler::new();
    cli_handler.process_command(command_line_interface)?;

    Ok(())
}
