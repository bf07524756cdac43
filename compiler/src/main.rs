use alpha_lang::cli::{Cli, CliHandler};
use alpha_lang::logging::setup_tracing;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.trace());
    let handler = CliHandler::new();

    if let Err(e) = handler.handle(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
