use crate::api::Store;
use crate::server::routes;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

/// HttpServer serves the users API on top of any `Store`: the primary's own store in standalone
/// mode, or a worker's RPC-backed store in cluster mode.
pub struct HttpServer {
    logger: slog::Logger,
    store: Arc<dyn Store>,
}

impl HttpServer {
    pub fn new(logger: slog::Logger, store: Arc<dyn Store>) -> Self {
        HttpServer { logger, store }
    }

    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), hyper::Error>
    where
        F: Future<Output = ()>,
    {
        let logger = self.logger.clone();
        let server = Arc::new(self);
        let make_service = make_service_fn(move |_conn| {
            let server = server.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    let server = server.clone();
                    async move {
                        let response = routes::handle(&server.logger, server.store.as_ref(), request).await;
                        Ok::<_, Infallible>(response)
                    }
                }))
            }
        });

        let server = Server::from_tcp(listener)?.serve(make_service);
        let local_addr: SocketAddr = server.local_addr();
        slog::info!(logger, "Listening on '{:?}'", local_addr);

        let result = server.with_graceful_shutdown(shutdown).await;
        slog::info!(logger, "Server run() has exited: {:?}", result);
        result
    }
}
