//! Main entry point for the certaudit CLI application

use certaudit::cli::{self, Cli};
use certaudit_common::LoggingTransformer;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    LoggingTransformer::init();

    cli::run(Cli::parse()).await
}
