mod routes;
mod server;
mod shutdown;

pub use server::HttpServer;
pub use shutdown::shutdown_signal;
pub use shutdown::ShutdownHandle;
pub use shutdown::ShutdownSignal;
