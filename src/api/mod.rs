//! This mod is meant to hold most of the code for the library's client-facing API.
mod logging;
mod options;
mod store;
mod types;
mod wiring;

pub use logging::create_root_logger;
pub use logging::LogTarget;
pub use options::ClusterOptions;
pub use options::DEFAULT_BALANCER_PORT;
pub use options::DEFAULT_CALL_TIMEOUT;
pub use options::DEFAULT_STANDALONE_PORT;
pub use store::Store;
pub use store::StoreError;
pub use types::NewRecord;
pub use types::Record;
pub use types::RecordId;
pub use types::RecordPatch;
pub use wiring::run_cluster;
pub use wiring::run_standalone;
pub use wiring::run_worker;
pub use wiring::ClusterError;
