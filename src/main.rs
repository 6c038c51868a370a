use clap::{Args, Parser, Subcommand};
use crud_cluster::{
    create_root_logger, run_cluster, run_standalone, run_worker, shutdown_signal, ClusterOptions, LogTarget,
    ProcessRole, ShutdownHandle, DEFAULT_CALL_TIMEOUT, DEFAULT_STANDALONE_PORT, ENV_CALL_TIMEOUT_MS, ENV_PORT,
};
use std::error::Error;
use tokio::time::Duration;

/// In-memory users API served by a primary process and a pool of worker processes.
#[derive(Parser)]
#[command(name = "crud-cluster", args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    // No subcommand means `cluster`.
    #[command(flatten)]
    cluster: ClusterArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Run the primary: spawn the workers and put the balancer in front of them.
    Cluster(ClusterArgs),
    /// Run as a worker. Only meant to be started by the primary.
    Worker(WorkerArgs),
    /// Run the HTTP server on its own, without workers.
    Serve(ServeArgs),
}

#[derive(Args)]
struct ClusterArgs {
    /// Balancer port. Worker i listens on port + i.
    #[arg(long, env = "CLUSTER_PORT")]
    port: Option<u16>,

    /// Defaults to one less than the number of cores.
    #[arg(long, env = "CLUSTER_WORKERS")]
    workers: Option<usize>,

    #[arg(long, env = ENV_CALL_TIMEOUT_MS)]
    call_timeout_ms: Option<u64>,
}

#[derive(Args)]
struct WorkerArgs {
    #[arg(long, env = ENV_PORT)]
    port: u16,

    #[arg(long, env = ENV_CALL_TIMEOUT_MS)]
    call_timeout_ms: Option<u64>,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = ENV_PORT, default_value_t = DEFAULT_STANDALONE_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let (shutdown_handle, shutdown) = shutdown_signal();

    match cli.command.unwrap_or(Command::Cluster(cli.cluster)) {
        Command::Cluster(args) => {
            let logger = create_root_logger("primary".to_string(), LogTarget::Stdout);
            spawn_ctrl_c_listener(logger.clone(), shutdown_handle);

            let options = ClusterOptions {
                balancer_port: args.port,
                worker_count: args.workers,
                call_timeout: args.call_timeout_ms.map(Duration::from_millis),
            };
            run_cluster(logger, options, shutdown).await?;
        }
        Command::Worker(args) => {
            let role = match ProcessRole::from_env() {
                ProcessRole::Worker(id) => id.to_string(),
                ProcessRole::Primary => "worker".to_string(),
            };
            let logger = create_root_logger(role, LogTarget::Stderr);
            spawn_ctrl_c_listener(logger.clone(), shutdown_handle);

            let call_timeout = args
                .call_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CALL_TIMEOUT);
            run_worker(logger, args.port, call_timeout, shutdown).await?;
        }
        Command::Serve(args) => {
            let logger = create_root_logger("standalone".to_string(), LogTarget::Stdout);
            spawn_ctrl_c_listener(logger.clone(), shutdown_handle);

            run_standalone(logger, args.port, shutdown).await?;
        }
    }

    Ok(())
}

fn spawn_ctrl_c_listener(logger: slog::Logger, shutdown_handle: ShutdownHandle) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                slog::info!(logger, "Received Ctrl-C, shutting down");
                drop(shutdown_handle);
            }
            Err(e) => {
                slog::error!(logger, "Can't listen for Ctrl-C"; "error" => %e);
                // Keep the handle so the servers keep running.
                std::future::pending::<()>().await;
                drop(shutdown_handle);
            }
        }
    });
}
