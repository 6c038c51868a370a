use crate::protocol::{
    ChannelError, CorrelationId, MessageReader, MessageWriter, Operation, Outcome, ToPrimary, ToWorker,
};
use crate::worker::mirror::Mirror;
use crate::worker::pending::PendingCalls;
use crate::worker::ProcessRole;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{self, Duration};

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    // Only worker processes have a primary to call.
    #[error("not running as a worker process")]
    NotAWorker,

    #[error("no reply from primary within {0:?}")]
    Timeout(Duration),

    #[error("channel to primary is closed")]
    PrimaryGone,
}

impl CallError {
    /// The primary may still be fine, or may be gone; either way we didn't get an answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CallError::Timeout(_) | CallError::PrimaryGone)
    }
}

/// WorkerRpcClient runs an operation on the primary and waits for the reply, matching replies
/// to callers by correlation id. Any number of calls may be in flight at once.
pub struct WorkerRpcClient {
    role: ProcessRole,
    pending: Arc<PendingCalls>,
    mirror: Arc<Mirror>,
    outbox: mpsc::UnboundedSender<ToPrimary>,
    call_timeout: Duration,
}

impl WorkerRpcClient {
    /// Starts the tasks that read replies from `from_primary` and write requests to
    /// `to_primary`.
    pub fn connect<R, W>(
        logger: slog::Logger,
        role: ProcessRole,
        from_primary: R,
        to_primary: W,
        call_timeout: Duration,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending = Arc::new(PendingCalls::new());
        let mirror = Arc::new(Mirror::new());
        let (outbox, outbox_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_to_primary(
            logger.clone(),
            outbox_rx,
            MessageWriter::new(to_primary),
        ));
        tokio::spawn(read_from_primary(
            logger,
            MessageReader::new(from_primary),
            pending.clone(),
            mirror.clone(),
        ));

        WorkerRpcClient {
            role,
            pending,
            mirror,
            outbox,
            call_timeout,
        }
    }

    pub async fn call(&self, operation: Operation) -> Result<Outcome, CallError> {
        if !self.role.is_worker() {
            return Err(CallError::NotAWorker);
        }

        let correlation_id = CorrelationId::new();
        let reply = self
            .pending
            .register(correlation_id, operation.clone())
            .map_err(|_| CallError::PrimaryGone)?;
        // Covers timeout, send failure and the caller dropping this future.
        let _evict = EvictOnDrop {
            pending: &self.pending,
            mirror: &self.mirror,
            correlation_id,
        };

        self.outbox
            .send(ToPrimary {
                correlation_id,
                operation,
            })
            .map_err(|_| CallError::PrimaryGone)?;

        match time::timeout(self.call_timeout, reply).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(CallError::PrimaryGone),
            Err(_) => Err(CallError::Timeout(self.call_timeout)),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn mirror(&self) -> &Mirror {
        &self.mirror
    }
}

struct EvictOnDrop<'a> {
    pending: &'a PendingCalls,
    mirror: &'a Mirror,
    correlation_id: CorrelationId,
}

impl Drop for EvictOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(call) = self.pending.evict(&self.correlation_id) {
            // If the primary applied it, the reply will arrive unmatched and the mirror misses it.
            if call.operation.is_mutation() {
                self.mirror.mark_out_of_sync();
            }
        }
    }
}

async fn write_to_primary<W>(
    logger: slog::Logger,
    mut outbox: mpsc::UnboundedReceiver<ToPrimary>,
    mut writer: MessageWriter<W, ToPrimary>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbox.recv().await {
        if let Err(e) = writer.send(&message).await {
            slog::warn!(logger, "Failed to write to primary: {:?}", e);
            return;
        }
    }
}

async fn read_from_primary<R>(
    logger: slog::Logger,
    mut reader: MessageReader<R, ToWorker>,
    pending: Arc<PendingCalls>,
    mirror: Arc<Mirror>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.next().await {
            Ok(Some(ToWorker::Reply {
                correlation_id,
                outcome,
            })) => match pending.resolve(&correlation_id) {
                Some(call) => {
                    mirror.apply_reply(&call.operation, &outcome);
                    call.complete(outcome);
                }
                None => {
                    slog::debug!(logger, "Dropping unmatched reply"; "correlation_id" => ?correlation_id);
                }
            },
            Ok(Some(ToWorker::Replicate { operation })) => {
                slog::debug!(logger, "Replicating {}", operation.name());
                mirror.apply_replicated(operation);
            }
            Ok(None) => {
                slog::info!(logger, "Primary closed the channel");
                break;
            }
            Err(ChannelError::Malformed(e)) => {
                // Might have been a replication we'll now never see.
                slog::warn!(logger, "Skipping malformed message from primary: {}", e);
                mirror.mark_out_of_sync();
            }
            Err(ChannelError::Io(e)) => {
                slog::warn!(logger, "Failed to read from primary: {:?}", e);
                break;
            }
        }
    }

    let abandoned = pending.close();
    if abandoned.iter().any(|call| call.operation.is_mutation()) {
        mirror.mark_out_of_sync();
    }
}
