use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;

use quote_race::config::{ObservabilityConfig, UpstreamConfig};
use quote_race::observability::init_logging;
use quote_race::race::{RaceError, RaceSelector};
use quote_race::sources::address::{normalize_cep, BRASILAPI_BASE, VIACEP_BASE};
use quote_race::sources::{cep_sources, HttpFetcher};

#[derive(Parser)]
#[command(name = "cep-race")]
#[command(about = "Look up a CEP on BrasilAPI and ViaCEP, keeping the fastest answer", long_about = None)]
struct Cli {
    /// Postal code, with or without the dash.
    cep: String,

    /// Budget for each lookup, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    per_task_ms: u64,

    /// Budget for the whole race, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    outer_ms: u64,

    #[arg(long, default_value = BRASILAPI_BASE)]
    brasilapi_url: String,

    #[arg(long, default_value = VIACEP_BASE)]
    viacep_url: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&ObservabilityConfig {
        log_level: "warn".to_string(),
        ..ObservabilityConfig::default()
    });

    let Some(cep) = normalize_cep(&cli.cep) else {
        eprintln!("invalid CEP {:?}: expected 8 digits", cli.cep);
        return ExitCode::FAILURE;
    };

    let selector = match RaceSelector::new(
        Duration::from_millis(cli.per_task_ms),
        Duration::from_millis(cli.outer_ms),
    ) {
        Ok(selector) => selector,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let fetcher = match HttpFetcher::new(&UpstreamConfig::default()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let sources = cep_sources(&cep, &cli.brasilapi_url, &cli.viacep_url);
    match selector.select(&sources, &fetcher).await {
        Ok(win) => {
            println!("Fastest: {} ({} ms)", win.winner.name, win.elapsed.as_millis());
            match serde_json::to_string_pretty(&win.value) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(RaceError::DeadlineExceeded(budget)) => {
            println!("Timeout: no answer within {} ms", budget.as_millis());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
