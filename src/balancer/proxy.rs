use crate::balancer::RoundRobin;
use hyper::client::HttpConnector;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Client, Request, Response, Server, StatusCode, Uri};
use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
#[error("balancer needs at least one worker endpoint")]
pub struct NoWorkers;

/// Balancer is a reverse proxy in front of the worker HTTP servers. Each request goes to the
/// next worker in round-robin order, untouched.
///
/// A worker that can't be reached stays in the rotation; requests routed to it get a 502.
pub struct Balancer {
    logger: slog::Logger,
    workers: RoundRobin<SocketAddr>,
    client: Client<HttpConnector>,
}

impl Balancer {
    pub fn new(logger: slog::Logger, workers: Vec<SocketAddr>) -> Result<Self, NoWorkers> {
        Ok(Balancer {
            logger,
            workers: RoundRobin::new(workers).ok_or(NoWorkers)?,
            client: Client::new(),
        })
    }

    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), hyper::Error>
    where
        F: Future<Output = ()>,
    {
        let logger = self.logger.clone();
        let balancer = Arc::new(self);
        let make_service = make_service_fn(move |_conn| {
            let balancer = balancer.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    let balancer = balancer.clone();
                    async move { Ok::<_, Infallible>(balancer.forward(request).await) }
                }))
            }
        });

        let server = Server::from_tcp(listener)?.serve(make_service);
        slog::info!(logger, "Balancer listening on '{:?}'", server.local_addr());

        let result = server.with_graceful_shutdown(shutdown).await;
        slog::info!(logger, "Balancer run() has exited: {:?}", result);
        result
    }

    /// Relays `request` to the next worker and returns the worker's response as is.
    pub async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let target = *self.workers.next();
        slog::info!(
            self.logger,
            "Proxying request to worker";
            "target" => %target,
            "method" => %request.method(),
            "path" => request.uri().path()
        );

        let (mut parts, body) = request.into_parts();
        parts.uri = match worker_uri(target, &parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                slog::warn!(self.logger, "Can't address worker"; "target" => %target, "error" => %e);
                return bad_gateway();
            }
        };

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => response,
            Err(e) => {
                slog::warn!(self.logger, "Worker request failed"; "target" => %target, "error" => %e);
                bad_gateway()
            }
        }
    }
}

fn worker_uri(target: SocketAddr, original: &Uri) -> Result<Uri, hyper::http::Error> {
    let path_and_query = original.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    Uri::builder()
        .scheme("http")
        .authority(target.to_string().as_str())
        .path_and_query(path_and_query)
        .build()
}

fn bad_gateway() -> Response<Body> {
    let mut response = Response::new(Body::from(r#"{"message":"Worker unavailable"}"#));
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
