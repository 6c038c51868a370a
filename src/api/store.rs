use crate::api::{Record, RecordId, RecordPatch};
use crate::protocol::{Operation, Outcome};
use crate::worker::CallError;

/// Store is the record store as seen by the HTTP layer. The primary side and the worker side
/// each have their own implementation; callers don't care which one they hold.
///
/// Implementors only provide `execute`. The typed methods translate the outcome.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn execute(&self, operation: Operation) -> Result<Outcome, StoreError>;

    async fn get_all(&self) -> Result<Vec<Record>, StoreError> {
        match self.execute(Operation::GetAll).await? {
            Outcome::Records(records) => Ok(records),
            outcome => Err(StoreError::unexpected("GetAll", outcome)),
        }
    }

    /// `Ok(None)` when no record has this id.
    async fn get_by_id(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        maybe_record("GetById", self.execute(Operation::GetById { id }).await?)
    }

    async fn create(&self, record: Record) -> Result<Record, StoreError> {
        match self.execute(Operation::Create { record }).await? {
            Outcome::Found(record) => Ok(record),
            Outcome::Conflict(id) => Err(StoreError::DuplicateId(id)),
            outcome => Err(StoreError::unexpected("Create", outcome)),
        }
    }

    /// `Ok(None)` when no record has this id.
    async fn update(&self, id: RecordId, fields: RecordPatch) -> Result<Option<Record>, StoreError> {
        maybe_record("Update", self.execute(Operation::Update { id, fields }).await?)
    }

    /// Returns the removed record, or `Ok(None)` when no record has this id.
    async fn delete(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        maybe_record("Delete", self.execute(Operation::Delete { id }).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("call to primary failed")]
    Call(#[from] CallError),

    // The in-process primary actor runs on a background task. This error is returned if the
    // task has exited.
    #[error("primary task has exited")]
    PrimaryExited,

    #[error("record {0} already exists")]
    DuplicateId(RecordId),

    #[error("{operation} got a reply of the wrong shape: {outcome:?}")]
    UnexpectedOutcome { operation: &'static str, outcome: Outcome },
}

impl StoreError {
    fn unexpected(operation: &'static str, outcome: Outcome) -> Self {
        StoreError::UnexpectedOutcome { operation, outcome }
    }
}

fn maybe_record(operation: &'static str, outcome: Outcome) -> Result<Option<Record>, StoreError> {
    match outcome {
        Outcome::Found(record) => Ok(Some(record)),
        Outcome::Absent => Ok(None),
        outcome => Err(StoreError::unexpected(operation, outcome)),
    }
}
