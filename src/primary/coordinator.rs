use crate::protocol::{Operation, Outcome, ToPrimary, ToWorker};
use crate::store::RecordStore;
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::mpsc;

/// WorkerId is the 1-based spawn index of a worker process.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct WorkerId(pub usize);

impl fmt::Debug for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Messages queued here are written to the worker's stdin by a dedicated task.
pub type WorkerOutbox = mpsc::UnboundedSender<ToWorker>;

/// Coordinator applies operations to the one authoritative `RecordStore` and keeps the
/// workers informed. It is driven by the primary actor and never shared.
pub struct Coordinator {
    logger: slog::Logger,
    store: RecordStore,
    workers: BTreeMap<WorkerId, WorkerOutbox>,
}

impl Coordinator {
    pub fn new(logger: slog::Logger) -> Self {
        Coordinator {
            logger,
            store: RecordStore::new(),
            workers: BTreeMap::new(),
        }
    }

    pub fn join(&mut self, worker: WorkerId, outbox: WorkerOutbox) {
        slog::info!(self.logger, "Worker channel attached"; "worker" => %worker);
        self.workers.insert(worker, outbox);
    }

    pub fn leave(&mut self, worker: WorkerId) {
        if self.workers.remove(&worker).is_some() {
            slog::info!(self.logger, "Worker channel detached"; "worker" => %worker);
        }
    }

    /// Apply, then reply to `from`, then replicate to every other worker.
    pub fn handle_from_worker(&mut self, from: WorkerId, message: ToPrimary) {
        let ToPrimary {
            correlation_id,
            operation,
        } = message;
        slog::debug!(
            self.logger,
            "Applying {}", operation.name();
            "worker" => %from,
            "correlation_id" => ?correlation_id
        );

        let replicated = Self::replicated_form(&operation);
        let outcome = self.store.apply(operation);

        self.send_to(from, ToWorker::Reply { correlation_id, outcome });
        if let Some(operation) = replicated {
            self.broadcast(Some(from), operation);
        }
    }

    /// Same as `handle_from_worker` for a caller living inside the primary process. Every
    /// worker gets the replication.
    pub fn handle_local(&mut self, operation: Operation) -> Outcome {
        let replicated = Self::replicated_form(&operation);
        let outcome = self.store.apply(operation);

        if let Some(operation) = replicated {
            self.broadcast(None, operation);
        }

        outcome
    }

    #[cfg(test)]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn replicated_form(operation: &Operation) -> Option<Operation> {
        if operation.is_mutation() {
            Some(operation.clone())
        } else {
            None
        }
    }

    fn broadcast(&self, except: Option<WorkerId>, operation: Operation) {
        for (worker, outbox) in self.workers.iter() {
            if Some(*worker) == except {
                continue;
            }
            let message = ToWorker::Replicate {
                operation: operation.clone(),
            };
            if outbox.send(message).is_err() {
                slog::warn!(self.logger, "Dropping replication to closed worker channel"; "worker" => %worker);
            }
        }
    }

    fn send_to(&self, worker: WorkerId, message: ToWorker) {
        match self.workers.get(&worker) {
            Some(outbox) => {
                if outbox.send(message).is_err() {
                    slog::warn!(self.logger, "Dropping reply to closed worker channel"; "worker" => %worker);
                }
            }
            None => {
                slog::warn!(self.logger, "Dropping reply to unknown worker"; "worker" => %worker);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Record, RecordId, RecordPatch};
    use crate::protocol::CorrelationId;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn record(username: &str, age: u32) -> Record {
        Record {
            id: RecordId::new_random(),
            username: username.to_string(),
            age: age.into(),
            hobbies: vec!["a".to_string()],
        }
    }

    fn coordinator_with_workers(n: usize) -> (Coordinator, Vec<UnboundedReceiver<ToWorker>>) {
        let mut coordinator = Coordinator::new(logger());
        let mut inboxes = Vec::with_capacity(n);
        for i in 1..=n {
            let (tx, rx) = mpsc::unbounded_channel();
            coordinator.join(WorkerId(i), tx);
            inboxes.push(rx);
        }

        (coordinator, inboxes)
    }

    fn request(operation: Operation) -> (CorrelationId, ToPrimary) {
        let correlation_id = CorrelationId::new();
        (
            correlation_id,
            ToPrimary {
                correlation_id,
                operation,
            },
        )
    }

    #[test]
    fn create_replies_to_sender_and_replicates_to_the_rest() {
        let (mut coordinator, mut inboxes) = coordinator_with_workers(3);
        let created = record("x", 30);
        let (correlation_id, message) = request(Operation::Create {
            record: created.clone(),
        });

        coordinator.handle_from_worker(WorkerId(2), message);

        assert_eq!(
            inboxes[1].try_recv().unwrap(),
            ToWorker::Reply {
                correlation_id,
                outcome: Outcome::Found(created.clone()),
            }
        );
        assert!(inboxes[1].try_recv().is_err());

        for i in &[0, 2] {
            assert_eq!(
                inboxes[*i].try_recv().unwrap(),
                ToWorker::Replicate {
                    operation: Operation::Create {
                        record: created.clone()
                    },
                }
            );
            assert!(inboxes[*i].try_recv().is_err());
        }
    }

    #[test]
    fn reads_are_not_replicated() {
        let (mut coordinator, mut inboxes) = coordinator_with_workers(2);
        let (_, message) = request(Operation::GetAll);

        coordinator.handle_from_worker(WorkerId(1), message);

        assert!(matches!(inboxes[0].try_recv().unwrap(), ToWorker::Reply { .. }));
        assert!(inboxes[1].try_recv().is_err());
    }

    #[test]
    fn update_of_missing_record_replies_absent() {
        let (mut coordinator, mut inboxes) = coordinator_with_workers(2);
        let fields = RecordPatch {
            age: Some(31.into()),
            ..RecordPatch::default()
        };
        let id = RecordId::new_random();
        let (correlation_id, message) = request(Operation::Update {
            id,
            fields: fields.clone(),
        });

        coordinator.handle_from_worker(WorkerId(1), message);

        assert_eq!(
            inboxes[0].try_recv().unwrap(),
            ToWorker::Reply {
                correlation_id,
                outcome: Outcome::Absent,
            }
        );
        assert_eq!(
            inboxes[1].try_recv().unwrap(),
            ToWorker::Replicate {
                operation: Operation::Update { id, fields },
            }
        );
    }

    #[test]
    fn departed_worker_gets_nothing() {
        let (mut coordinator, mut inboxes) = coordinator_with_workers(2);
        coordinator.leave(WorkerId(2));

        let (_, message) = request(Operation::Create { record: record("x", 1) });
        coordinator.handle_from_worker(WorkerId(1), message);

        assert_eq!(coordinator.worker_count(), 1);
        assert!(inboxes[1].try_recv().is_err());
    }

    #[test]
    fn local_mutations_replicate_to_every_worker() {
        let (mut coordinator, mut inboxes) = coordinator_with_workers(2);
        let created = record("x", 1);

        let outcome = coordinator.handle_local(Operation::Create {
            record: created.clone(),
        });

        assert_eq!(outcome, Outcome::Found(created));
        assert!(matches!(inboxes[0].try_recv().unwrap(), ToWorker::Replicate { .. }));
        assert!(matches!(inboxes[1].try_recv().unwrap(), ToWorker::Replicate { .. }));
    }
}
