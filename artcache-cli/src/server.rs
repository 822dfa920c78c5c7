//! HTTP surface for the artwork service.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /artwork/generate?url=` | animated clip |
//! | `GET /artwork/{key}.{gif,webp}` | clip bytes |
//! | `POST /artwork/artist-square` | composite square |
//! | `GET /artwork/artist-square/{key}.jpg` | square bytes |
//! | `POST /artwork/icloud` | resized copy |
//! | `GET /artwork/icloud/{key}[.ext]` | resized bytes |
//!
//! Generation answers carry `{key, message, url}`; every error carries
//! `{"error": "..."}`.

use artcache::generate::transcode::Transcoder;
use artcache::key::CacheKey;
use artcache::provider::AsyncHttpClient;
use artcache::service::{messages, ArtworkResponse, ArtworkService};
use artcache::store::{ArtifactClass, StoreError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

type Shared<C, T> = Arc<ArtworkService<C, T>>;

#[derive(Debug, Deserialize)]
struct ClipQuery {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SquareBody {
    #[serde(rename = "imageUrls", default)]
    image_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResizeBody {
    #[serde(rename = "imageUrl", default)]
    image_url: String,
}

#[derive(Debug, Serialize)]
struct GeneratedBody<'a> {
    key: &'a str,
    message: &'a str,
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Builds the router for `service`.
pub fn router<C, T>(service: Shared<C, T>) -> Router
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    Router::new()
        .route("/artwork/generate", get(generate_clip::<C, T>))
        .route("/artwork/{file}", get(serve_clip::<C, T>))
        .route("/artwork/artist-square", post(generate_square::<C, T>))
        .route("/artwork/artist-square/{file}", get(serve_square::<C, T>))
        .route("/artwork/icloud", post(generate_resized::<C, T>))
        .route("/artwork/icloud/{file}", get(serve_resized::<C, T>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serves `service` on `listener` until `shutdown` fires.
pub async fn serve<C, T>(
    listener: TcpListener,
    service: Shared<C, T>,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "HTTP server listening");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn generate_clip<C, T>(
    State(service): State<Shared<C, T>>,
    Query(query): Query<ClipQuery>,
) -> Response
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    let url = query.url.unwrap_or_default();
    render(service.generate_clip(&url).await)
}

async fn generate_square<C, T>(
    State(service): State<Shared<C, T>>,
    body: Result<Json<SquareBody>, JsonRejection>,
) -> Response
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    match body {
        Ok(Json(body)) => render(service.generate_square(body.image_urls).await),
        Err(rejection) => error(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

async fn generate_resized<C, T>(
    State(service): State<Shared<C, T>>,
    body: Result<Json<ResizeBody>, JsonRejection>,
) -> Response
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    match body {
        Ok(Json(body)) => render(service.generate_resized(&body.image_url).await),
        Err(rejection) => error(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

async fn serve_clip<C, T>(State(service): State<Shared<C, T>>, Path(file): Path<String>) -> Response
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    serve_artifact(&service, ArtifactClass::AnimatedClip, &file).await
}

async fn serve_square<C, T>(
    State(service): State<Shared<C, T>>,
    Path(file): Path<String>,
) -> Response
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    serve_artifact(&service, ArtifactClass::CompositeSquare, &file).await
}

async fn serve_resized<C, T>(
    State(service): State<Shared<C, T>>,
    Path(file): Path<String>,
) -> Response
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    serve_artifact(&service, ArtifactClass::ResizedCopy, &file).await
}

async fn serve_artifact<C, T>(
    service: &ArtworkService<C, T>,
    class: ArtifactClass,
    file: &str,
) -> Response
where
    C: AsyncHttpClient + 'static,
    T: Transcoder + 'static,
{
    let not_found = || error(StatusCode::NOT_FOUND, messages(class).not_found);

    let Some((key, ext)) = split_file_name(file) else {
        return not_found();
    };
    if ext.is_some_and(|e| !class.allows_extension(e)) {
        return not_found();
    }

    match service.open(class, &key, ext).await {
        Ok((location, bytes)) => {
            ([(header::CONTENT_TYPE, location.content_type())], bytes).into_response()
        }
        Err(StoreError::NotFound { .. }) => not_found(),
        Err(e) => {
            warn!(key = %key, class = %class, error = %e, "Failed to read artifact");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read artwork")
        }
    }
}

/// Splits `{key}` or `{key}.{ext}`, rejecting anything that is not a key.
fn split_file_name(file: &str) -> Option<(CacheKey, Option<&str>)> {
    match file.split_once('.') {
        Some((key, ext)) => CacheKey::parse(key).map(|k| (k, Some(ext))),
        None => CacheKey::parse(file).map(|k| (k, None)),
    }
}

fn render(response: ArtworkResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match response.url() {
        Some(url) => {
            let body = GeneratedBody {
                key: response.key().map(CacheKey::as_str).unwrap_or_default(),
                message: response.message(),
                url,
            };
            (status, Json(body)).into_response()
        }
        None => error(status, response.message()),
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}
