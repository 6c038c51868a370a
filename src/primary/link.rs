use crate::actor::{ActorClient, ActorExited};
use crate::primary::WorkerId;
use crate::protocol::{ChannelError, MessageReader, MessageWriter, ToPrimary, ToWorker};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// attach_worker wires one worker's pipes to the primary actor. `from_worker` carries the
/// worker's requests, `to_worker` carries replies and replication.
///
/// The worker is registered with the actor before any of its requests are read, so the actor
/// always knows where to send a reply.
pub async fn attach_worker<R, W>(
    logger: slog::Logger,
    actor_client: ActorClient,
    worker: WorkerId,
    from_worker: R,
    to_worker: W,
) -> Result<(), ActorExited>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let logger = logger.new(slog::o!("worker" => worker.to_string()));
    let (outbox, outbox_rx) = mpsc::unbounded_channel();

    actor_client.worker_joined(worker, outbox).await?;

    tokio::spawn(write_to_worker(
        logger.clone(),
        outbox_rx,
        MessageWriter::new(to_worker),
    ));
    tokio::spawn(read_from_worker(
        logger,
        actor_client,
        worker,
        MessageReader::new(from_worker),
    ));

    Ok(())
}

async fn write_to_worker<W>(
    logger: slog::Logger,
    mut outbox: mpsc::UnboundedReceiver<ToWorker>,
    mut writer: MessageWriter<W, ToWorker>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbox.recv().await {
        if let Err(e) = writer.send(&message).await {
            slog::warn!(logger, "Failed to write to worker: {:?}", e);
            return;
        }
    }
}

async fn read_from_worker<R>(
    logger: slog::Logger,
    actor_client: ActorClient,
    worker: WorkerId,
    mut reader: MessageReader<R, ToPrimary>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.next().await {
            Ok(Some(message)) => {
                if actor_client.from_worker(worker, message).await.is_err() {
                    slog::warn!(logger, "Primary actor is gone; no longer reading from worker");
                    return;
                }
            }
            Ok(None) => {
                slog::info!(logger, "Worker closed its channel");
                break;
            }
            // Can't correlate a message we can't read. Skip it; the worker's call will time out.
            Err(ChannelError::Malformed(e)) => {
                slog::warn!(logger, "Skipping malformed message from worker: {}", e);
            }
            Err(ChannelError::Io(e)) => {
                slog::warn!(logger, "Failed to read from worker: {:?}", e);
                break;
            }
        }
    }

    let _ = actor_client.worker_left(worker).await;
}
