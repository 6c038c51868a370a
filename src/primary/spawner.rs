use crate::primary::WorkerId;
use crate::worker::{ENV_CALL_TIMEOUT_MS, ENV_PORT, ENV_WORKER_ID};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Duration;

/// WorkerSpawner starts worker processes by re-running the current executable with the
/// `worker` subcommand.
pub struct WorkerSpawner {
    logger: slog::Logger,
    program: PathBuf,
    call_timeout: Duration,
}

/// A started worker. Its stdin and stdout are the message channel.
pub struct SpawnedWorker {
    pub id: WorkerId,
    pub to_worker: ChildStdin,
    pub from_worker: ChildStdout,
    child: Child,
}

impl WorkerSpawner {
    pub fn for_current_exe(logger: slog::Logger, call_timeout: Duration) -> io::Result<Self> {
        Ok(WorkerSpawner {
            logger,
            program: std::env::current_exe()?,
            call_timeout,
        })
    }

    pub fn spawn(&self, id: WorkerId, port: u16) -> io::Result<SpawnedWorker> {
        let mut child = Command::new(&self.program)
            .arg("worker")
            .env(ENV_WORKER_ID, id.0.to_string())
            .env(ENV_PORT, port.to_string())
            .env(ENV_CALL_TIMEOUT_MS, self.call_timeout.as_millis().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let to_worker = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "worker stdin was not piped"))?;
        let from_worker = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "worker stdout was not piped"))?;

        slog::info!(self.logger, "Spawned worker"; "worker" => %id, "port" => port, "pid" => ?child.id());

        Ok(SpawnedWorker {
            id,
            to_worker,
            from_worker,
            child,
        })
    }
}

impl SpawnedWorker {
    /// Splits the worker into its channel halves and a task that reports when the process exits.
    /// Dropping the task's future (e.g. on runtime shutdown) kills the worker.
    pub fn into_channel(self, logger: slog::Logger) -> (ChildStdout, ChildStdin) {
        let SpawnedWorker {
            id,
            to_worker,
            from_worker,
            mut child,
        } = self;

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => slog::warn!(logger, "Worker exited"; "worker" => %id, "status" => %status),
                Err(e) => slog::error!(logger, "Failed waiting on worker"; "worker" => %id, "error" => %e),
            }
        });

        (from_worker, to_worker)
    }
}
