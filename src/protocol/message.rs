use crate::api::{Record, RecordId, RecordPatch};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// CorrelationId pairs a call a worker makes with the reply the primary sends back.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        CorrelationId(Uuid::new_v4())
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The five things a worker can ask of the primary's record store.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    GetAll,
    GetById { id: RecordId },
    Create { record: Record },
    Update { id: RecordId, fields: RecordPatch },
    Delete { id: RecordId },
}

impl Operation {
    pub fn is_mutation(&self) -> bool {
        match self {
            Operation::GetAll | Operation::GetById { .. } => false,
            Operation::Create { .. } | Operation::Update { .. } | Operation::Delete { .. } => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetAll => "GetAll",
            Operation::GetById { .. } => "GetById",
            Operation::Create { .. } => "Create",
            Operation::Update { .. } => "Update",
            Operation::Delete { .. } => "Delete",
        }
    }
}

/// Result of applying an `Operation` to a record store.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    // GetAll
    Records(Vec<Record>),
    // GetById, Create, Update, Delete
    Found(Record),
    // No record matched the id.
    Absent,
    // Create with an id that is already taken.
    Conflict(RecordId),
}

/// Worker -> primary.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ToPrimary {
    pub correlation_id: CorrelationId,
    pub operation: Operation,
}

/// Primary -> worker.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToWorker {
    /// Answer to a `ToPrimary` this worker sent.
    Reply {
        correlation_id: CorrelationId,
        outcome: Outcome,
    },
    /// A mutation another worker made, applied on the primary already.
    Replicate { operation: Operation },
}
