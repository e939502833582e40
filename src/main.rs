use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sortq::api::{run_api, ApiState, JobResponse};
use sortq::config::{ServiceConfig, WorkerConfig};
use sortq::scheduler::{PickPolicy, SortJob};
use sortq::service::SortService;
use sortq::shutdown::install_shutdown_handler;
use sortq::worker::SortExecutor;

#[derive(Parser, Debug)]
#[command(name = "sortq")]
#[command(version)]
#[command(about = "An asynchronous sort-job queue with a background worker")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the HTTP service and its queue worker
    Server(ServerArgs),

    /// Sort values locally, without a running service
    Sort(SortArgs),
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Port to listen on for HTTP
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Sleep between scans of an empty queue, in milliseconds
    #[arg(long, default_value = "1000")]
    idle_backoff_ms: u64,

    /// Artificial delay added to every sort, in milliseconds
    #[arg(long, default_value = "5000")]
    sort_delay_ms: u64,

    /// Job selection policy: "rotate" or "pending-fifo"
    #[arg(long, default_value = "rotate")]
    pick_policy: PickPolicy,

    /// Buffered job events per subscriber
    #[arg(long, default_value = "1024")]
    event_capacity: usize,
}

// =============================================================================
// Sort Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct SortArgs {
    /// Values to sort
    #[arg(required = true, allow_negative_numbers = true)]
    values: Vec<i64>,

    /// Artificial delay added to the sort, in milliseconds
    #[arg(long, default_value = "0")]
    sort_delay_ms: u64,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let listen_addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let config = ServiceConfig {
        listen_addr,
        worker: WorkerConfig::with_delays(args.idle_backoff_ms, args.sort_delay_ms)
            .with_pick_policy(args.pick_policy),
        event_capacity: args.event_capacity,
    };

    tracing::info!(
        addr = %config.listen_addr,
        sort_delay = ?config.worker.sort_delay,
        policy = %config.worker.pick_policy,
        "Starting sortq"
    );

    let shutdown = CancellationToken::new();
    install_shutdown_handler(shutdown.clone());

    let service = Arc::new(SortService::start(&config, shutdown.clone()));
    let state = ApiState {
        service: service.clone(),
    };

    let served = run_api(config.listen_addr, state, shutdown.clone()).await;

    // Stop the worker even if the API failed to bind.
    shutdown.cancel();
    service.shutdown().await;
    tracing::info!("sortq stopped");

    served?;
    Ok(())
}

// =============================================================================
// Local Sort Implementation
// =============================================================================

async fn run_sort(args: SortArgs) -> Result<(), Box<dyn std::error::Error>> {
    let executor = SortExecutor::new(std::time::Duration::from_millis(args.sort_delay_ms));
    let job = executor.execute(&SortJob::new(args.values)).await;
    let response = JobResponse::from(job);

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => {
            let join = |values: &[i64]| {
                values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            println!("{:<10} {}", "ID", response.id);
            println!("{:<10} {}", "STATUS", response.status.to_uppercase());
            println!("{:<10} {}", "INPUT", join(&response.input));
            println!(
                "{:<10} {}",
                "OUTPUT",
                join(response.output.as_deref().unwrap_or_default())
            );
            if let Some(ms) = response.duration_ms {
                println!("{:<10} {:.3} ms", "DURATION", ms);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => run_server(server_args).await,
        Commands::Sort(sort_args) => run_sort(sort_args).await,
    }
}
