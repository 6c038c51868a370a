//! The primary process: the actor that owns the record store, the wiring that connects worker
//! pipes to it, and the spawning of worker processes.
mod coordinator;
mod link;
mod local_store;
mod spawner;

pub use coordinator::Coordinator;
pub use coordinator::WorkerId;
pub use coordinator::WorkerOutbox;
pub use local_store::LocalStore;
pub use spawner::WorkerSpawner;

use crate::actor::{self, ActorClient, ActorExited};
use tokio::io::{AsyncRead, AsyncWrite};

const ACTOR_QUEUE_SIZE: usize = 64;

/// Primary is a handle to a running primary actor.
#[derive(Clone)]
pub struct Primary {
    logger: slog::Logger,
    actor_client: ActorClient,
}

impl Primary {
    /// Starts the primary actor on a background task.
    pub fn start(logger: slog::Logger) -> Self {
        let (actor_client, actor) = actor::create(logger.clone(), ACTOR_QUEUE_SIZE);
        tokio::spawn(actor.run_event_loop());

        Primary { logger, actor_client }
    }

    /// Connects a worker's channel. See `link::attach_worker`.
    pub async fn attach_worker<R, W>(&self, worker: WorkerId, from_worker: R, to_worker: W) -> Result<(), ActorExited>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        link::attach_worker(
            self.logger.clone(),
            self.actor_client.clone(),
            worker,
            from_worker,
            to_worker,
        )
        .await
    }

    pub fn local_store(&self) -> LocalStore {
        LocalStore::new(self.actor_client.clone())
    }
}
