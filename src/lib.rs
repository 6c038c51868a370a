mod actor;
mod api;
mod balancer;
mod primary;
mod protocol;
mod server;
mod store;
mod worker;

pub use api::create_root_logger;
pub use api::run_cluster;
pub use api::run_standalone;
pub use api::run_worker;
pub use api::ClusterError;
pub use api::ClusterOptions;
pub use api::LogTarget;
pub use api::NewRecord;
pub use api::Record;
pub use api::RecordId;
pub use api::RecordPatch;
pub use api::Store;
pub use api::StoreError;
pub use api::DEFAULT_BALANCER_PORT;
pub use api::DEFAULT_CALL_TIMEOUT;
pub use api::DEFAULT_STANDALONE_PORT;
pub use balancer::Balancer;
pub use balancer::NoWorkers;
pub use balancer::RoundRobin;
pub use primary::LocalStore;
pub use primary::Primary;
pub use primary::WorkerId;
pub use protocol::Operation;
pub use protocol::Outcome;
pub use server::shutdown_signal;
pub use server::HttpServer;
pub use server::ShutdownHandle;
pub use server::ShutdownSignal;
pub use worker::CallError;
pub use worker::ProcessRole;
pub use worker::WorkerRpcClient;
pub use worker::WorkerStore;
pub use worker::ENV_CALL_TIMEOUT_MS;
pub use worker::ENV_PORT;
pub use worker::ENV_WORKER_ID;
