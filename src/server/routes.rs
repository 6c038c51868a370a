use crate::api::{NewRecord, RecordId, RecordPatch, Store, StoreError};
use hyper::body::HttpBody;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::Serialize;

const COLLECTION: &str = "/api/users";
const ITEM_PREFIX: &str = "/api/users/";

/// Largest request body we'll buffer.
pub(crate) const MAX_BODY_BYTES: usize = 64 * 1024;

enum Route<'a> {
    Collection,
    // The first segment after `/api/users/`, which may be empty.
    Item(&'a str),
    Unknown,
}

fn route(path: &str) -> Route<'_> {
    if path == COLLECTION {
        return Route::Collection;
    }

    match path.strip_prefix(ITEM_PREFIX) {
        Some(rest) => Route::Item(rest.split('/').next().unwrap_or("")),
        None => Route::Unknown,
    }
}

/// What went wrong, as far as the HTTP client is concerned.
#[derive(Debug)]
enum ApiError {
    InvalidId,
    InvalidJson,
    InvalidData,
    PayloadTooLarge,
    UserNotFound,
    RouteNotFound,
    AlreadyExists,
    Internal(StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId | ApiError::InvalidJson | ApiError::InvalidData => StatusCode::BAD_REQUEST,
            ApiError::UserNotFound | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::InvalidId => "Invalid user ID format",
            ApiError::InvalidJson => "Invalid JSON",
            ApiError::InvalidData => "Invalid user data",
            ApiError::PayloadTooLarge => "Request body too large",
            ApiError::UserNotFound => "User not found",
            ApiError::RouteNotFound => "Route not found",
            ApiError::AlreadyExists => "User already exists",
            ApiError::Internal(_) => "Internal Server Error",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateId(_) => ApiError::AlreadyExists,
            e => ApiError::Internal(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: &'static str,
}

/// handle serves one request of the users API against `store`.
pub(crate) async fn handle(logger: &slog::Logger, store: &dyn Store, request: Request<Body>) -> Response<Body> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // `/api/users/` is the collection for GET and POST, and an empty id for everything else.
    let result = match (route(&path), &method) {
        (Route::Collection, &Method::GET) | (Route::Item(""), &Method::GET) => get_all(store).await,
        (Route::Collection, &Method::POST) | (Route::Item(""), &Method::POST) => create(store, request).await,
        (Route::Item(id), &Method::GET) => get_by_id(store, id).await,
        (Route::Item(id), &Method::PUT) => update(store, id, request).await,
        (Route::Item(id), &Method::DELETE) => delete(store, id).await,
        _ => Err(ApiError::RouteNotFound),
    };

    match result {
        Ok(response) => {
            slog::info!(logger, "{} {}", method, path; "status" => response.status().as_u16());
            response
        }
        Err(ApiError::Internal(e)) => {
            slog::error!(logger, "{} {}", method, path; "status" => 500, "error" => %e);
            error_response(ApiError::Internal(e))
        }
        Err(e) => {
            slog::info!(logger, "{} {}", method, path; "status" => e.status().as_u16(), "reason" => e.message());
            error_response(e)
        }
    }
}

async fn get_all(store: &dyn Store) -> Result<Response<Body>, ApiError> {
    let records = store.get_all().await?;
    Ok(json(StatusCode::OK, &records))
}

async fn get_by_id(store: &dyn Store, raw_id: &str) -> Result<Response<Body>, ApiError> {
    let id = parse_id(raw_id)?;
    let record = store.get_by_id(id).await?.ok_or(ApiError::UserNotFound)?;
    Ok(json(StatusCode::OK, &record))
}

async fn create(store: &dyn Store, request: Request<Body>) -> Result<Response<Body>, ApiError> {
    let new_record: NewRecord = read_json(request).await?;
    let record = store.create(new_record.with_id(RecordId::new_random())).await?;
    Ok(json(StatusCode::CREATED, &record))
}

// The body must be a complete record, same as for create. Any `id` in it is ignored.
async fn update(store: &dyn Store, raw_id: &str, request: Request<Body>) -> Result<Response<Body>, ApiError> {
    let id = parse_id(raw_id)?;
    let fields: NewRecord = read_json(request).await?;

    let record = store.update(id, RecordPatch::from(fields)).await?.ok_or(ApiError::UserNotFound)?;
    Ok(json(StatusCode::OK, &record))
}

async fn delete(store: &dyn Store, raw_id: &str) -> Result<Response<Body>, ApiError> {
    let id = parse_id(raw_id)?;
    store.delete(id).await?.ok_or(ApiError::UserNotFound)?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    Ok(response)
}

fn parse_id(raw_id: &str) -> Result<RecordId, ApiError> {
    raw_id.parse().map_err(|_| ApiError::InvalidId)
}

// Syntax errors and shape errors are reported differently.
async fn read_json<T: serde::de::DeserializeOwned>(request: Request<Body>) -> Result<T, ApiError> {
    let bytes = read_body(request).await?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|_| ApiError::InvalidJson)?;
    if !value.is_object() {
        return Err(ApiError::InvalidData);
    }

    serde_json::from_value(value).map_err(|_| ApiError::InvalidData)
}

async fn read_body(request: Request<Body>) -> Result<Vec<u8>, ApiError> {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.map_or(false, |len| len > MAX_BODY_BYTES) {
        return Err(ApiError::PayloadTooLarge);
    }

    // Chunked bodies carry no length up front, so count as we go.
    let mut body = request.into_body();
    let mut bytes = Vec::with_capacity(declared.unwrap_or(0));
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(|_| ApiError::InvalidJson)?;
        if bytes.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(ApiError::PayloadTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(_) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn error_response(e: ApiError) -> Response<Body> {
    json(e.status(), &ErrorBody { message: e.message() })
}
