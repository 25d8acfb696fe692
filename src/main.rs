use chrono::Utc;
use clap::Parser;
use payoff::api::{Cli, Command, run_http_server, run_plan};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                error!(error = %e, "server error");
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Plan(args) => match run_plan(args, Utc::now()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
    }
}
