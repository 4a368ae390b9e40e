//! magick-forge CLI - WebAssembly ImageMagick builder
//!
//! Entry point for the magick-forge command-line application.

use clap::Parser;

use magick_forge::cli::output::{display_error, exit_code, OutputConfig};
use magick_forge::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    OutputConfig::new(cli.quiet).apply_global();

    if let Err(e) = cli.run().await {
        display_error(&e);
        std::process::exit(exit_code(&e));
    }
}
