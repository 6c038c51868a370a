use crate::api::{Record, RecordId, RecordPatch};
use crate::protocol::{Operation, Outcome};

/// RecordStore is an ordered, in-memory list of records. It does no locking of its own; whoever
/// owns it is expected to be the only one touching it.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore { records: vec![] }
    }

    /// apply runs a single operation to completion and reports what happened.
    pub fn apply(&mut self, operation: Operation) -> Outcome {
        match operation {
            Operation::GetAll => Outcome::Records(self.all()),
            Operation::GetById { id } => Self::found_or_absent(self.get(&id)),
            Operation::Create { record } => match self.insert(record) {
                Ok(record) => Outcome::Found(record),
                Err(id) => Outcome::Conflict(id),
            },
            Operation::Update { id, fields } => Self::found_or_absent(self.update(&id, &fields)),
            Operation::Delete { id } => Self::found_or_absent(self.remove(&id)),
        }
    }

    pub fn all(&self) -> Vec<Record> {
        self.records.clone()
    }

    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.position(id).map(|i| self.records[i].clone())
    }

    /// Appends `record`. Fails with the id if it's already taken.
    pub fn insert(&mut self, record: Record) -> Result<Record, RecordId> {
        if self.position(&record.id).is_some() {
            return Err(record.id);
        }

        self.records.push(record.clone());
        Ok(record)
    }

    /// Merges `fields` into the record with `id`, returning the merged record.
    pub fn update(&mut self, id: &RecordId, fields: &RecordPatch) -> Option<Record> {
        let i = self.position(id)?;
        let record = &mut self.records[i];
        fields.merge_into(record);

        Some(record.clone())
    }

    /// Removes the record with `id`. Remaining records keep their relative order.
    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        let i = self.position(id)?;
        Some(self.records.remove(i))
    }

    /// Inserts `record`, or overwrites the stored record with the same id in place.
    pub fn upsert(&mut self, record: Record) {
        match self.position(&record.id) {
            Some(i) => self.records[i] = record,
            None => self.records.push(record),
        }
    }

    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }

    fn found_or_absent(record: Option<Record>) -> Outcome {
        match record {
            Some(record) => Outcome::Found(record),
            None => Outcome::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str, age: u32, hobbies: &[&str]) -> Record {
        Record {
            id: RecordId::new_random(),
            username: username.to_string(),
            age: age.into(),
            hobbies: hobbies.iter().map(|h| h.to_string()).collect(),
        }
    }

    #[test]
    fn update_merges_present_fields_only() {
        let mut store = RecordStore::new();
        let original = record("x", 30, &["a"]);
        store.insert(original.clone()).unwrap();

        let patch = RecordPatch {
            age: Some(31.into()),
            ..RecordPatch::default()
        };
        let updated = store.update(&original.id, &patch).unwrap();

        assert_eq!(
            updated,
            Record {
                id: original.id,
                username: "x".to_string(),
                age: 31.into(),
                hobbies: vec!["a".to_string()],
            }
        );
        assert_eq!(store.get(&original.id), Some(updated));
    }

    #[test]
    fn update_of_unknown_id_is_absent() {
        let mut store = RecordStore::new();
        store.insert(record("x", 30, &[])).unwrap();

        let outcome = store.apply(Operation::Update {
            id: RecordId::new_random(),
            fields: RecordPatch {
                username: Some("y".to_string()),
                ..RecordPatch::default()
            },
        });

        assert_eq!(outcome, Outcome::Absent);
        assert_eq!(store.all()[0].username, "x");
    }

    #[test]
    fn delete_twice() {
        let mut store = RecordStore::new();
        let doomed = record("x", 30, &[]);
        store.insert(doomed.clone()).unwrap();

        let never_existed = RecordId::new_random();
        assert_eq!(store.apply(Operation::Delete { id: never_existed }), Outcome::Absent);
        assert_eq!(store.apply(Operation::Delete { id: never_existed }), Outcome::Absent);

        assert_eq!(
            store.apply(Operation::Delete { id: doomed.id }),
            Outcome::Found(doomed.clone())
        );
        assert_eq!(store.apply(Operation::Delete { id: doomed.id }), Outcome::Absent);
        assert!(store.is_empty());
    }

    #[test]
    fn delete_keeps_insertion_order() {
        let mut store = RecordStore::new();
        let a = record("a", 1, &[]);
        let b = record("b", 2, &[]);
        let c = record("c", 3, &[]);
        for r in vec![a.clone(), b.clone(), c.clone()] {
            store.insert(r).unwrap();
        }

        store.remove(&b.id);

        assert_eq!(store.all(), vec![a, c]);
    }

    #[test]
    fn create_rejects_taken_id() {
        let mut store = RecordStore::new();
        let first = record("x", 30, &[]);
        store.insert(first.clone()).unwrap();

        let mut imposter = record("y", 40, &[]);
        imposter.id = first.id;

        assert_eq!(
            store.apply(Operation::Create { record: imposter }),
            Outcome::Conflict(first.id)
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&first.id), Some(first));
    }
}
