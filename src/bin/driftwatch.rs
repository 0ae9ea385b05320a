use clap::Parser;
use driftwatch::tooling::{Cli, CliContext};
use std::process;

fn main() {
    // Load .env before the config layer reads the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let context = match CliContext::new(cli.config.clone()) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = context.init_logging(&cli) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    match context.execute(&cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
