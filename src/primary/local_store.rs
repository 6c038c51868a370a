use crate::actor::ActorClient;
use crate::api::{Store, StoreError};
use crate::protocol::{Operation, Outcome};

/// LocalStore reaches the record store by queueing on the primary actor directly. It's what a
/// server running inside the primary process uses.
#[derive(Clone)]
pub struct LocalStore {
    actor_client: ActorClient,
}

impl LocalStore {
    pub(crate) fn new(actor_client: ActorClient) -> Self {
        LocalStore { actor_client }
    }
}

#[async_trait::async_trait]
impl Store for LocalStore {
    async fn execute(&self, operation: Operation) -> Result<Outcome, StoreError> {
        self.actor_client
            .execute(operation)
            .await
            .map_err(|_| StoreError::PrimaryExited)
    }
}
