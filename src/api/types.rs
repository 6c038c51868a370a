use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// RecordId is the primary key of a record. It's assigned by whoever creates the record and
/// never changes afterwards.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new_random() -> Self {
        RecordId(Uuid::new_v4())
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(RecordId)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub username: String,
    // Any JSON number. Kept as written so `25` doesn't come back as `25.0`.
    pub age: Number,
    pub hobbies: Vec<String>,
}

/// NewRecord is a record that hasn't been given an id yet.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub username: String,
    pub age: Number,
    pub hobbies: Vec<String>,
}

impl NewRecord {
    pub fn with_id(self, id: RecordId) -> Record {
        Record {
            id,
            username: self.username,
            age: self.age,
            hobbies: self.hobbies,
        }
    }
}

/// RecordPatch holds the fields an update overwrites. Absent fields are left alone. Ids are
/// immutable, so a patch can't carry one.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hobbies: Option<Vec<String>>,
}

/// Every field of a `NewRecord` is present, so the patch overwrites them all.
impl From<NewRecord> for RecordPatch {
    fn from(fields: NewRecord) -> Self {
        RecordPatch {
            username: Some(fields.username),
            age: Some(fields.age),
            hobbies: Some(fields.hobbies),
        }
    }
}

impl RecordPatch {
    pub(crate) fn merge_into(&self, record: &mut Record) {
        if let Some(username) = &self.username {
            record.username = username.clone();
        }
        if let Some(age) = &self.age {
            record.age = age.clone();
        }
        if let Some(hobbies) = &self.hobbies {
            record.hobbies = hobbies.clone();
        }
    }
}
