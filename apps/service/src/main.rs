use std::path::PathBuf;

use anyhow::{Context, Result};
use apiwatch_service::monitoring::HttpMethod;
use apiwatch_service::{Config, EndpointRequest, Monitor, ProbeResult, StatsSummary};
use clap::{Parser, Subcommand};
use logger::init_tracing_with_level;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "apiwatch-service", version, about = "Scheduled HTTP endpoint health checks")]
struct Cli {
    /// Path to the config file (defaults to $APIWATCH_CONFIG or ~/.config/apiwatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at DEBUG instead of INFO (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler and retention cleanup until Ctrl+C
    Run,
    /// Probe one endpoint now
    Check { id: i64 },
    /// Probe every active endpoint now
    CheckAll,
    /// Show health and latency statistics
    Stats {
        /// Only this endpoint
        id: Option<i64>,
        /// Only active endpoints
        #[arg(long, conflicts_with = "id")]
        active: bool,
    },
    /// Delete probe results older than the retention window
    Cleanup,
    /// Manage monitored endpoints
    #[command(subcommand)]
    Endpoints(EndpointsCommand),
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum EndpointsCommand {
    List {
        /// Only active endpoints
        #[arg(long)]
        active: bool,
    },
    /// Print the number of active endpoints
    Count,
    Add {
        name: String,
        url: String,
        #[arg(long, default_value = "GET")]
        method: HttpMethod,
        #[arg(long, default_value_t = 200)]
        expected_status: u16,
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        #[arg(long, default_value_t = 30000)]
        check_interval_ms: u64,
        /// Register the endpoint without scheduling it
        #[arg(long)]
        inactive: bool,
    },
    /// Flip an endpoint between active and inactive
    Toggle { id: i64 },
    /// Delete an endpoint and its probe history
    Remove { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_tracing_with_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO });

    let config = Config::from_config(cli.config.as_ref()).context("Failed to load configuration")?;

    if let Command::Config = cli.command {
        println!("{config}");
        return Ok(());
    }

    let monitor = Monitor::open(&config).await?;

    match cli.command {
        Command::Run => run(&monitor).await?,
        Command::Check { id } => print_result(&monitor.trigger_check(id).await?),
        Command::CheckAll => {
            for result in monitor.trigger_all_checks().await? {
                print_result(&result);
            }
        }
        Command::Stats { id: Some(id), .. } => print_stats(&monitor.get_stats(id).await?),
        Command::Stats { id: None, active } => {
            let stats = if active {
                monitor.get_active_stats().await?
            } else {
                monitor.get_all_stats().await?
            };
            for summary in &stats {
                print_stats(summary);
            }
        }
        Command::Cleanup => {
            let deleted = monitor.cleanup_expired_results().await?;
            println!("Deleted {deleted} expired probe results");
        }
        Command::Endpoints(command) => manage_endpoints(&monitor, command).await?,
        Command::Config => unreachable!("handled before opening the database"),
    }

    Ok(())
}

async fn run(monitor: &Monitor) -> Result<()> {
    let shutdown = CancellationToken::new();
    let tasks = monitor.start(shutdown.clone());

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    info!("Ctrl+C received, shutting down");

    shutdown.cancel();
    tasks.join().await;
    Ok(())
}

async fn manage_endpoints(monitor: &Monitor, command: EndpointsCommand) -> Result<()> {
    let service = monitor.endpoints();

    match command {
        EndpointsCommand::List { active } => {
            let endpoints = if active { service.list_active().await? } else { service.list().await? };
            for endpoint in endpoints {
                let last = match monitor.latest_result(endpoint.id_or_default()).await? {
                    Some(result) if result.success => format!("last OK {}ms", result.response_time_ms),
                    Some(result) => format!("last FAIL ({})", result.outcome),
                    None => "never checked".to_string(),
                };
                println!(
                    "{:>4}  {:<8} {:<7} {:<24} {} (expect {}, timeout {}ms, every {}ms, {})",
                    endpoint.id_or_default(),
                    if endpoint.active { "active" } else { "inactive" },
                    endpoint.method.as_str(),
                    endpoint.name,
                    endpoint.url,
                    endpoint.expected_status,
                    endpoint.timeout_ms,
                    endpoint.check_interval_ms,
                    last,
                );
            }
        }
        EndpointsCommand::Count => println!("{}", service.count_active().await?),
        EndpointsCommand::Add { name, url, method, expected_status, timeout_ms, check_interval_ms, inactive } => {
            let request = EndpointRequest {
                name,
                url,
                method: method.to_string(),
                expected_status,
                timeout_ms,
                check_interval_ms,
                active: !inactive,
            };
            let endpoint = service.create(request).await?;
            println!("Created endpoint {} with id {}", endpoint.name, endpoint.id_or_default());
        }
        EndpointsCommand::Toggle { id } => {
            let endpoint = service.toggle(id).await?;
            println!(
                "Endpoint {} is now {}",
                endpoint.name,
                if endpoint.active { "active" } else { "inactive" }
            );
        }
        EndpointsCommand::Remove { id } => {
            service.delete(id).await?;
            println!("Deleted endpoint {id}");
        }
    }

    Ok(())
}

fn print_result(result: &ProbeResult) {
    let status = result.status_code.map_or_else(|| "-".to_string(), |code| code.to_string());
    match &result.error_message {
        None => println!(
            "endpoint {:>4}  OK    status {}  {}ms",
            result.endpoint_id, status, result.response_time_ms
        ),
        Some(error) => println!(
            "endpoint {:>4}  FAIL  status {}  {}ms  {} ({})",
            result.endpoint_id, status, result.response_time_ms, error, result.outcome
        ),
    }
}

fn print_stats(stats: &StatsSummary) {
    let health = match stats.is_healthy {
        Some(true) => "healthy",
        Some(false) => "unhealthy",
        None => "unknown",
    };

    println!("{} [{}] {}", stats.endpoint_name, stats.endpoint_id, stats.url);
    println!("  Status:   {health}");
    println!(
        "  Uptime:   {} ({}/{} checks)",
        stats.formatted_uptime(),
        stats.successful_checks,
        stats.total_checks
    );
    println!(
        "  Latency:  latest {}, avg {}, min {}, max {}",
        stats.formatted_latest_response_time(),
        stats.formatted_average_response_time(),
        stats.formatted_min_response_time(),
        stats.formatted_max_response_time()
    );
    if !stats.recent_response_times.is_empty() {
        println!("  Range:    {}", stats.response_time_range());
    }
    if let Some(error) = &stats.last_error {
        println!("  Last error: {error}");
    }
}
