use crate::api::{Store, StoreError};
use crate::protocol::{Operation, Outcome};
use crate::worker::WorkerRpcClient;
use std::sync::Arc;

/// WorkerStore is the `Store` a worker process serves HTTP from. Every operation goes to the
/// primary. Reads fall back to the worker's mirror when the primary can't be reached and the
/// mirror is known to be in sync; writes never do.
#[derive(Clone)]
pub struct WorkerStore {
    logger: slog::Logger,
    client: Arc<WorkerRpcClient>,
}

impl WorkerStore {
    pub fn new(logger: slog::Logger, client: Arc<WorkerRpcClient>) -> Self {
        WorkerStore { logger, client }
    }

    /// Loads a full snapshot from the primary into the mirror.
    pub async fn sync_mirror(&self) -> Result<(), StoreError> {
        self.client.call(Operation::GetAll).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for WorkerStore {
    async fn execute(&self, operation: Operation) -> Result<Outcome, StoreError> {
        let fallback = if operation.is_mutation() {
            None
        } else {
            Some(operation.clone())
        };

        match self.client.call(operation).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_unavailable() => {
                let mirrored = fallback.and_then(|read| self.client.mirror().read(&read));
                match mirrored {
                    Some(outcome) => {
                        slog::warn!(self.logger, "Primary unavailable, answering read from mirror"; "cause" => %e);
                        Ok(outcome)
                    }
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Record, RecordId};
    use crate::primary::WorkerId;
    use crate::protocol::{ChannelError, MessageReader, MessageWriter, ToPrimary, ToWorker};
    use crate::worker::{CallError, ProcessRole};
    use std::error::Error;
    use tokio::io::DuplexStream;
    use tokio::time::Duration;

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn record(username: &str) -> Record {
        Record {
            id: RecordId::new_random(),
            username: username.to_string(),
            age: 42.into(),
            hobbies: vec![],
        }
    }

    fn connect() -> (
        WorkerStore,
        MessageReader<DuplexStream, ToPrimary>,
        MessageWriter<DuplexStream, ToWorker>,
    ) {
        let (worker_in, primary_out) = tokio::io::duplex(64 * 1024);
        let (primary_in, worker_out) = tokio::io::duplex(64 * 1024);
        let client = WorkerRpcClient::connect(
            logger(),
            ProcessRole::Worker(WorkerId(1)),
            worker_in,
            worker_out,
            Duration::from_secs(1),
        );

        (
            WorkerStore::new(logger(), Arc::new(client)),
            MessageReader::new(primary_in),
            MessageWriter::new(primary_out),
        )
    }

    #[tokio::test]
    async fn reads_fall_back_to_synced_mirror_when_primary_is_gone() -> Result<(), Box<dyn Error>> {
        let (store, mut from_worker, mut to_worker) = connect();
        let existing = record("existing");

        let primary = async {
            let request = from_worker.next().await?.expect("snapshot request");
            assert_eq!(request.operation, Operation::GetAll);
            to_worker
                .send(&ToWorker::Reply {
                    correlation_id: request.correlation_id,
                    outcome: Outcome::Records(vec![existing.clone()]),
                })
                .await?;
            Ok::<_, ChannelError>(())
        };
        let (synced, served) = tokio::join!(store.sync_mirror(), primary);
        synced?;
        served?;

        drop(to_worker);
        drop(from_worker);

        assert_eq!(store.get_all().await?, vec![existing.clone()]);
        assert_eq!(store.get_by_id(existing.id).await?, Some(existing.clone()));
        assert!(matches!(
            store.create(record("new")).await,
            Err(StoreError::Call(CallError::PrimaryGone))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unsynced_mirror_is_never_read() {
        let (store, from_worker, to_worker) = connect();
        drop(to_worker);
        drop(from_worker);

        assert!(matches!(
            store.get_all().await,
            Err(StoreError::Call(CallError::PrimaryGone))
        ));
    }
}
