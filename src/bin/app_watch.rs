//! Watches one app until its build settles, polling the server's query API.

use apphost::db::{AppRecord, ModelAppState};
use apphost::polling::{ApiClient, PollOutcome, StatusPoller};
use apphost::version::VERSION;

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Base URL of the app host server
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    api: String,

    /// Id of the app to watch
    #[arg(long)]
    id: i32,

    /// Seconds between status queries
    #[arg(long, default_value_t = 3)]
    interval_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

fn describe(app: Option<&AppRecord>) -> String {
    match app {
        Some(app) if app.image_name.is_empty() => format!("{} [{}]", app.name, app.state.label()),
        Some(app) => format!("{} [{}] image={}", app.name, app.state.label(), app.image_name),
        None => format!("no app [{}]", ModelAppState::Stopped.label()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let client = match ApiClient::new(args.api, Duration::from_secs(args.timeout_secs)) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            return ExitCode::from(1);
        }
    };

    let poller = StatusPoller::new(client).with_interval(Duration::from_secs(args.interval_secs.max(1)));
    let mut print_observation = |app: Option<&AppRecord>| println!("{}", describe(app));

    match poller.poll_until_settled(args.id, &mut print_observation).await {
        PollOutcome::Settled(app) if app.state.is_error() => ExitCode::from(2),
        PollOutcome::Settled(_) => ExitCode::SUCCESS,
        PollOutcome::NoApp => ExitCode::from(3),
        PollOutcome::QueryFailed { last_known, error } => {
            eprintln!("Status query failed: {error}");
            eprintln!("Last known: {}", describe(last_known.as_ref()));
            ExitCode::from(1)
        }
    }
}
