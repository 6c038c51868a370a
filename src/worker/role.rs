use crate::primary::WorkerId;
use std::env;

/// Set by the primary on every worker it spawns.
pub const ENV_WORKER_ID: &str = "CLUSTER_WORKER_ID";
pub const ENV_PORT: &str = "PORT";
pub const ENV_CALL_TIMEOUT_MS: &str = "CLUSTER_CALL_TIMEOUT_MS";

/// ProcessRole says which side of the primary/worker channel this process is on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProcessRole {
    Primary,
    Worker(WorkerId),
}

impl ProcessRole {
    /// A process is a worker iff the primary gave it a worker id when spawning it.
    pub fn from_env() -> Self {
        match env::var(ENV_WORKER_ID).ok().and_then(|v| v.parse::<usize>().ok()) {
            Some(id) => ProcessRole::Worker(WorkerId(id)),
            None => ProcessRole::Primary,
        }
    }

    pub fn is_worker(&self) -> bool {
        matches!(self, ProcessRole::Worker(_))
    }
}
