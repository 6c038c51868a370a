//! The worker side of the primary/worker channel: the RPC client that correlates calls with
//! replies, and the `Store` implementation built on it.
mod mirror;
mod pending;
mod role;
mod rpc_client;
mod worker_store;

pub use role::ProcessRole;
pub use role::ENV_CALL_TIMEOUT_MS;
pub use role::ENV_PORT;
pub use role::ENV_WORKER_ID;
pub use rpc_client::CallError;
pub use rpc_client::WorkerRpcClient;
pub use worker_store::WorkerStore;
