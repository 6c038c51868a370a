use crate::api::options::ClusterOptionsValidated;
use crate::api::ClusterOptions;
use crate::actor::ActorExited;
use crate::balancer::{Balancer, NoWorkers};
use crate::primary::{Primary, WorkerId, WorkerSpawner};
use crate::server::{HttpServer, ShutdownSignal};
use crate::worker::{ProcessRole, WorkerRpcClient, WorkerStore};
use std::convert::TryFrom;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Illegal options for configuring cluster: {0}")]
    IllegalOptions(String),
    #[error("Failed to bind port {port}")]
    Bind { port: u16, source: io::Error },
    #[error("Failed to spawn worker")]
    Spawn(#[source] io::Error),
    #[error("Primary task has exited")]
    PrimaryExited(#[from] ActorExited),
    #[error(transparent)]
    NoWorkers(#[from] NoWorkers),
    #[error("HTTP server failure")]
    Http(#[from] hyper::Error),
    // Only a process spawned by the primary can run as a worker.
    #[error("Worker mode requires {0} to be set by the primary")]
    NotAWorker(&'static str),
}

/// Runs the primary: the record store actor, one worker process per configured worker, and
/// the balancer in front of them. Returns once `shutdown` fires or the balancer fails.
pub async fn run_cluster(
    logger: slog::Logger,
    options: ClusterOptions,
    shutdown: ShutdownSignal,
) -> Result<(), ClusterError> {
    let options =
        ClusterOptionsValidated::try_from(options).map_err(|e| ClusterError::IllegalOptions(e.to_string()))?;

    // Bind first so a busy port fails before any worker is started.
    let listener = bind(options.balancer_port)?;

    let primary = Primary::start(logger.clone());
    let spawner = WorkerSpawner::for_current_exe(logger.clone(), options.call_timeout).map_err(ClusterError::Spawn)?;

    let mut worker_addrs = Vec::with_capacity(options.worker_count);
    for n in 1..=options.worker_count {
        let id = WorkerId(n);
        let port = options.worker_port(n);
        let worker = spawner.spawn(id, port).map_err(ClusterError::Spawn)?;
        slog::info!(logger, "Started worker"; "worker" => %id, "port" => port);

        let (from_worker, to_worker) = worker.into_channel(logger.clone());
        primary.attach_worker(id, from_worker, to_worker).await?;
        worker_addrs.push(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
    }

    let balancer = Balancer::new(logger.new(slog::o!("component" => "balancer")), worker_addrs)?;
    balancer.run(listener, shutdown.wait()).await?;
    Ok(())
}

/// Runs a worker process: an HTTP server whose store lives in the primary, reached over this
/// process's stdin and stdout.
pub async fn run_worker(
    logger: slog::Logger,
    port: u16,
    call_timeout: Duration,
    shutdown: ShutdownSignal,
) -> Result<(), ClusterError> {
    let role = ProcessRole::from_env();
    if !role.is_worker() {
        return Err(ClusterError::NotAWorker(crate::worker::ENV_WORKER_ID));
    }

    let listener = bind(port)?;
    serve_worker(
        logger,
        role,
        tokio::io::stdin(),
        tokio::io::stdout(),
        listener,
        call_timeout,
        shutdown,
    )
    .await
}

// The listener is already bound when this runs, so the balancer can reach the worker while
// the mirror is still being seeded.
async fn serve_worker<R, W>(
    logger: slog::Logger,
    role: ProcessRole,
    from_primary: R,
    to_primary: W,
    listener: TcpListener,
    call_timeout: Duration,
    shutdown: ShutdownSignal,
) -> Result<(), ClusterError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let client = WorkerRpcClient::connect(logger.clone(), role, from_primary, to_primary, call_timeout);
    let store = WorkerStore::new(logger.clone(), Arc::new(client));

    let seeding = store.clone();
    let seed_logger = logger.clone();
    tokio::spawn(async move {
        if let Err(e) = seeding.sync_mirror().await {
            // Not fatal. Reads simply won't fall back to the mirror until it is in sync.
            slog::warn!(seed_logger, "Initial mirror sync failed"; "error" => %e);
        }
    });

    HttpServer::new(logger, Arc::new(store))
        .run(listener, shutdown.wait())
        .await?;
    Ok(())
}

/// Runs the HTTP server in a single process, against an in-process primary.
pub async fn run_standalone(logger: slog::Logger, port: u16, shutdown: ShutdownSignal) -> Result<(), ClusterError> {
    let primary = Primary::start(logger.clone());
    let listener = bind(port)?;

    HttpServer::new(logger, Arc::new(primary.local_store()))
        .run(listener, shutdown.wait())
        .await?;
    Ok(())
}

fn bind(port: u16) -> Result<TcpListener, ClusterError> {
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).map_err(|source| ClusterError::Bind { port, source })
}
