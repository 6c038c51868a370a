use crate::primary::{Coordinator, WorkerId, WorkerOutbox};
use crate::protocol::{Operation, Outcome, ToPrimary};
use tokio::sync::{mpsc, oneshot};

pub fn create(logger: slog::Logger, buffer_size: usize) -> (ActorClient, PrimaryActor) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let client = ActorClient { sender: tx };
    let actor = PrimaryActor {
        logger: logger.clone(),
        receiver: rx,
        coordinator: Coordinator::new(logger),
    };

    (client, actor)
}

#[derive(Debug)]
enum Event {
    // A worker's channel is wired up. Start replicating to it.
    WorkerJoined(WorkerId, WorkerOutbox),

    // A worker's channel closed. Stop replicating to it.
    WorkerLeft(WorkerId),

    // Apply, reply to the sender, replicate mutations to everyone else.
    FromWorker(WorkerId, ToPrimary),

    // Apply, reply via callback, replicate mutations to every worker.
    Local(Operation, Callback<Outcome>),
}

#[derive(Debug)]
struct Callback<O>(oneshot::Sender<O>);

impl<O> Callback<O> {
    pub fn send(self, message: O) {
        // Caller may have given up on us. That's fine.
        let _ = self.0.send(message);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("primary actor has exited")]
pub struct ActorExited;

#[derive(Clone)]
pub struct ActorClient {
    sender: mpsc::Sender<Event>,
}

impl ActorClient {
    pub async fn execute(&self, operation: Operation) -> Result<Outcome, ActorExited> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::Local(operation, Callback(tx))).await?;

        rx.await.map_err(|_| ActorExited)
    }

    pub async fn worker_joined(&self, worker: WorkerId, outbox: WorkerOutbox) -> Result<(), ActorExited> {
        self.send(Event::WorkerJoined(worker, outbox)).await
    }

    pub async fn worker_left(&self, worker: WorkerId) -> Result<(), ActorExited> {
        self.send(Event::WorkerLeft(worker)).await
    }

    pub async fn from_worker(&self, worker: WorkerId, message: ToPrimary) -> Result<(), ActorExited> {
        self.send(Event::FromWorker(worker, message)).await
    }

    async fn send(&self, event: Event) -> Result<(), ActorExited> {
        self.sender.send(event).await.map_err(|_| ActorExited)
    }
}

/// PrimaryActor owns the authoritative record store. Everything that wants to read or change
/// it goes through the actor's queue, so operations are applied strictly one after another.
pub struct PrimaryActor {
    logger: slog::Logger,
    receiver: mpsc::Receiver<Event>,
    coordinator: Coordinator,
}

impl PrimaryActor {
    pub async fn run_event_loop(mut self) {
        while let Some(event) = self.receiver.recv().await {
            self.handle_event(event);
        }

        slog::info!(self.logger, "Primary event loop exited");
    }

    // This must NOT be async. An operation is applied, answered and replicated before the
    // next event is looked at.
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::WorkerJoined(worker, outbox) => {
                self.coordinator.join(worker, outbox);
            }
            Event::WorkerLeft(worker) => {
                self.coordinator.leave(worker);
            }
            Event::FromWorker(worker, message) => {
                self.coordinator.handle_from_worker(worker, message);
            }
            Event::Local(operation, callback) => {
                let outcome = self.coordinator.handle_local(operation);
                callback.send(outcome);
            }
        }
    }
}
