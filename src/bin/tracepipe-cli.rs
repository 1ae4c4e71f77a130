use clap::{Parser, Subcommand};

use tracepipe::observability::metrics::{sample, ERRORS_TOTAL, REQUESTS_TOTAL};

#[derive(Parser)]
#[command(name = "tracepipe-cli")]
#[command(about = "Management CLI for the tracepipe backend", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8888")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read or change the failure-injection threshold
    Threshold {
        #[command(subcommand)]
        action: ThresholdAction,
    },
    /// Summarize request and error counters of a gateway or backend
    Metrics {
        /// Print the full Prometheus exposition instead
        #[arg(long)]
        raw: bool,
    },
}

#[derive(Subcommand)]
enum ThresholdAction {
    /// Print the current threshold in milliseconds
    Get,
    /// Set a new threshold in milliseconds
    Set {
        #[arg(allow_negative_numbers = true)]
        millis: i64,
    },
}

const ERROR_GENERATOR_PATH: &str = "/api/features/errorGenerator";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Threshold { action: ThresholdAction::Get } => {
            let res = client
                .get(format!("{}{}", base, ERROR_GENERATOR_PATH))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Threshold { action: ThresholdAction::Set { millis } } => {
            let res = client
                .put(format!("{}{}", base, ERROR_GENERATOR_PATH))
                .body(millis.to_string())
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Metrics { raw: true } => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Metrics { raw: false } => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            let status = res.status();
            let text = res.text().await?;
            if !status.is_success() {
                eprintln!("Error: service returned status {}", status);
                std::process::exit(1);
            }
            let requests = sample(&text, REQUESTS_TOTAL);
            let errors = sample(&text, ERRORS_TOTAL);
            println!("requests: {}", requests);
            println!("errors:   {}", errors);
            if requests > 0 {
                println!("error rate: {:.2}%", errors as f64 * 100.0 / requests as f64);
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    println!("{}", text.trim_end());
    Ok(())
}
