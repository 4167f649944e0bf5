use anyhow::Result;
use clap::Parser;
use colored::*;

mod api_client;
mod output;
mod scenarios;
mod sse_client;

use api_client::ApiClient;
use output::print_test_summary;

#[derive(Parser)]
#[command(name = "relay-test-client")]
#[command(about = "Webhook relay integration testing tool")]
struct Cli {
    /// Base URL of the relay (e.g., http://localhost:8000)
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,

    /// Queue capacity the server was started with (used by the busy test)
    #[arg(long, default_value_t = 10)]
    queue_capacity: usize,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Open a stream and check nothing arrives unprompted
    ConnectionTest,
    /// Post a message and receive it on a stream
    RoundTrip,
    /// Two streams share a batch of messages without duplicates
    CompetingConsumers,
    /// Fill the queue with no consumers attached and expect a 503
    BusyTest,
    /// Run every scenario, busy test last
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== TEST PHASE ===".bright_white().bold());
    println!("{} Target: {}", "→".blue(), cli.base_url);

    let client = reqwest::Client::new();
    let api_client = ApiClient::new(client, cli.base_url.clone());

    let mut results = Vec::new();

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {
            results.push(scenarios::test_connection(&cli.base_url).await?);
        }
        ScenarioChoice::RoundTrip => {
            results.push(scenarios::test_round_trip(&cli.base_url, &api_client).await?);
        }
        ScenarioChoice::CompetingConsumers => {
            results.push(scenarios::test_competing_consumers(&cli.base_url, &api_client).await?);
        }
        ScenarioChoice::BusyTest => {
            results.push(
                scenarios::test_busy(&cli.base_url, &api_client, cli.queue_capacity).await?,
            );
        }
        ScenarioChoice::All => {
            results.push(scenarios::test_connection(&cli.base_url).await?);
            results.push(scenarios::test_round_trip(&cli.base_url, &api_client).await?);
            results.push(scenarios::test_competing_consumers(&cli.base_url, &api_client).await?);
            // Give the server a moment to notice the earlier streams are gone.
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            results.push(
                scenarios::test_busy(&cli.base_url, &api_client, cli.queue_capacity).await?,
            );
        }
    }

    // Print summary
    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
