use clap::Parser;
use poolbench_client::{HttpPool, TargetConfig};
use poolbench_common::{Result, DEFAULT_RUN_TIMEOUT_SECS};
use poolbench_harness::config::{parse_positive, RequestCount, RunConfig};
use poolbench_harness::logging;
use poolbench_harness::worker::Dispatcher;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "poolbench",
    version,
    about = "Benchmarks connection acquisition and operation execution times of a connection pool"
)]
struct Args {
    /// Path to the target configuration file (JSON).
    #[arg(short = 'p', long, value_name = "FILE")]
    properties: PathBuf,

    /// Operation to execute for every request (request path for HTTP targets).
    #[arg(short, long)]
    query: String,

    /// Number of connections in the pool.
    #[arg(short, long, allow_negative_numbers = true)]
    connections: i64,

    /// Number of concurrent workers. Defaults to the number of connections.
    #[arg(short, long, allow_negative_numbers = true)]
    threads: Option<i64>,

    /// Requests issued by each worker; the run total is threads × this value.
    #[arg(
        short = 'n',
        long,
        allow_negative_numbers = true,
        required_unless_present = "total_requests",
        conflicts_with = "total_requests"
    )]
    requests_per_thread: Option<i64>,

    /// Total requests across all workers.
    #[arg(long, allow_negative_numbers = true)]
    total_requests: Option<i64>,

    /// Give up on the run after this many seconds.
    #[arg(long, default_value_t = DEFAULT_RUN_TIMEOUT_SECS as i64, allow_negative_numbers = true)]
    timeout_secs: i64,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    logging::init(args.verbose);

    process::exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return e.exit_code();
        }
    };

    if let Some(warning) = config.contention_warning() {
        println!("{warning}");
    }

    let pool = match TargetConfig::load(&args.properties)
        .and_then(|target| HttpPool::new(&target, config.connections))
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("{e}");
            return e.exit_code();
        }
    };

    match Dispatcher::new(Arc::new(pool), config).run(shutdown_signal()).await {
        Ok(report) => {
            tracing::info!(
                elapsed_ms = report.elapsed.as_millis() as u64,
                throughput_rps = report.throughput_rps(),
                "run summary"
            );
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = report.write_to(&mut stdout) {
                tracing::error!("Failed to write report: {e}");
                return 1;
            }
            0
        }
        Err(e) => e.exit_code(),
    }
}

fn build_config(args: &Args) -> Result<RunConfig> {
    // clap guarantees exactly one of the two is present.
    let requests = match args.total_requests {
        Some(total) => RequestCount::Total(total),
        None => RequestCount::PerThread(args.requests_per_thread.unwrap_or_default()),
    };
    let timeout = parse_positive(args.timeout_secs, "timeout")?;
    Ok(
        RunConfig::new(args.connections, args.threads, requests, args.query.clone())?
            .with_timeout(Duration::from_secs(u64::from(timeout))),
    )
}

/// Resolves on Ctrl+C. If the handler cannot be installed the run is never interrupted.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
