use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use quote_race::client::{append_quote, QuoteClient};
use quote_race::config::{load_config, ServerConfig};
use quote_race::observability::init_logging;

#[derive(Parser)]
#[command(name = "quote-client")]
#[command(about = "Fetch the current USD-BRL bid from a quote server", long_about = None)]
struct Cli {
    /// Shared TOML configuration; the `client` section supplies defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Quote endpoint of the server.
    #[arg(short, long)]
    url: Option<String>,

    /// Budget for the whole round trip, in milliseconds.
    #[arg(short, long)]
    budget_ms: Option<u64>,

    /// Ledger file the bid is appended to.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    init_logging(&config.observability);

    if let Some(url) = cli.url {
        config.client.server_url = url;
    }
    if let Some(budget_ms) = cli.budget_ms {
        config.client.budget_ms = budget_ms;
    }
    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&config.client.output_path));

    let client = match QuoteClient::from_config(&config.client, &config.upstream) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let bid = match client.fetch_quote().await {
        Ok(bid) => bid,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch quote");
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = append_quote(&output, &bid).await {
        eprintln!("failed to write {}: {}", output.display(), e);
        return ExitCode::FAILURE;
    }

    println!("Dólar: {}", bid);
    ExitCode::SUCCESS
}
