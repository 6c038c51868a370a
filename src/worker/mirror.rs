use crate::protocol::{Operation, Outcome};
use crate::store::RecordStore;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mirror is a worker-local copy of the primary's record store.
///
/// Replies and replication reach a worker on a single channel, in the order the primary
/// applied the operations, so replaying them in arrival order reproduces the primary's store.
/// The copy is only trusted while `in_sync`: it starts out of sync, a `GetAll` snapshot puts
/// it in sync, and losing track of a mutation's reply takes it out again.
#[derive(Debug, Default)]
pub(crate) struct Mirror {
    state: Mutex<MirrorState>,
}

#[derive(Debug, Default)]
struct MirrorState {
    store: RecordStore,
    in_sync: bool,
}

impl Mirror {
    pub fn new() -> Self {
        Mirror::default()
    }

    /// Another worker's mutation, as relayed by the primary.
    pub fn apply_replicated(&self, operation: Operation) {
        self.lock().store.apply(operation);
    }

    /// The reply to one of our own calls.
    pub fn apply_reply(&self, operation: &Operation, outcome: &Outcome) {
        let mut state = self.lock();
        match (operation, outcome) {
            (Operation::GetAll, Outcome::Records(records)) => {
                state.store.replace_all(records.clone());
                state.in_sync = true;
            }
            (Operation::GetById { .. }, Outcome::Found(record)) => {
                state.store.upsert(record.clone());
            }
            (Operation::GetById { id }, Outcome::Absent) => {
                state.store.remove(id);
            }
            (Operation::GetAll, _) | (Operation::GetById { .. }, _) => {}
            (mutation, _) => {
                state.store.apply(mutation.clone());
            }
        }
    }

    pub fn mark_out_of_sync(&self) {
        self.lock().in_sync = false;
    }

    #[cfg(test)]
    pub fn is_in_sync(&self) -> bool {
        self.lock().in_sync
    }

    /// Answers a read from the local copy. `None` for mutations or while out of sync.
    pub fn read(&self, operation: &Operation) -> Option<Outcome> {
        let mut state = self.lock();
        if !state.in_sync || operation.is_mutation() {
            return None;
        }

        Some(state.store.apply(operation.clone()))
    }

    fn lock(&self) -> MutexGuard<'_, MirrorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Record, RecordId, RecordPatch};

    fn record(username: &str) -> Record {
        Record {
            id: RecordId::new_random(),
            username: username.to_string(),
            age: 30.into(),
            hobbies: vec![],
        }
    }

    #[test]
    fn untrusted_until_snapshot() {
        let mirror = Mirror::new();
        assert_eq!(mirror.read(&Operation::GetAll), None);

        let existing = record("a");
        mirror.apply_reply(&Operation::GetAll, &Outcome::Records(vec![existing.clone()]));

        assert_eq!(mirror.read(&Operation::GetAll), Some(Outcome::Records(vec![existing])));
    }

    #[test]
    fn follows_replicated_and_own_mutations() {
        let mirror = Mirror::new();
        mirror.apply_reply(&Operation::GetAll, &Outcome::Records(vec![]));

        let theirs = record("theirs");
        let ours = record("ours");
        mirror.apply_replicated(Operation::Create { record: theirs.clone() });
        let create = Operation::Create { record: ours.clone() };
        mirror.apply_reply(&create, &Outcome::Found(ours.clone()));
        mirror.apply_replicated(Operation::Update {
            id: ours.id,
            fields: RecordPatch {
                username: Some("renamed".to_string()),
                ..RecordPatch::default()
            },
        });
        mirror.apply_replicated(Operation::Delete { id: theirs.id });

        let renamed = Record {
            username: "renamed".to_string(),
            ..ours
        };
        assert_eq!(mirror.read(&Operation::GetAll), Some(Outcome::Records(vec![renamed])));
    }

    #[test]
    fn never_answers_mutations() {
        let mirror = Mirror::new();
        mirror.apply_reply(&Operation::GetAll, &Outcome::Records(vec![]));

        assert_eq!(mirror.read(&Operation::Delete { id: RecordId::new_random() }), None);
    }

    #[test]
    fn out_of_sync_until_next_snapshot() {
        let mirror = Mirror::new();
        mirror.apply_reply(&Operation::GetAll, &Outcome::Records(vec![]));
        mirror.mark_out_of_sync();

        assert!(!mirror.is_in_sync());
        assert_eq!(mirror.read(&Operation::GetAll), None);

        mirror.apply_reply(&Operation::GetAll, &Outcome::Records(vec![]));
        assert!(mirror.is_in_sync());
    }
}
