//! HTTP service
//!
//! `GET /movie/amazon/:amazon_id` fetches the product page, runs the movie
//! extractor over it and answers with the movie as JSON. Every failure is a
//! JSON object with a single `error` message.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use url::Url;

use crate::extractors::{AmazonPrimeExtractor, PageExtractor};
use crate::fetch::{FetchError, PageFetcher};

const NOT_FOUND_PATH: &str = "the requested path is not found";
const NOT_FOUND_MOVIE: &str = "the requested movie is not found";
const INTERNAL: &str = "internal server error";

#[derive(Debug, Serialize)]
struct ErrorReply {
    error: &'static str,
}

fn error_reply(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorReply { error })).into_response()
}

/// Shared handler state
pub struct AppState<F> {
    fetcher: Arc<F>,
    extractor: Arc<AmazonPrimeExtractor>,
    product_base_url: Arc<Url>,
}

impl<F> AppState<F> {
    pub fn new(fetcher: F, extractor: AmazonPrimeExtractor, product_base_url: Url) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            product_base_url: Arc::new(product_base_url),
        }
    }

    /// URL of the product page for `amazon_id`
    pub fn product_url(&self, amazon_id: &str) -> Option<Url> {
        if amazon_id.is_empty() || !amazon_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        self.product_base_url.join(amazon_id).ok()
    }
}

// Derived Clone would require `F: Clone`
impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            product_base_url: Arc::clone(&self.product_base_url),
        }
    }
}

/// Build the service router
pub fn router<F>(state: AppState<F>) -> Router
where
    F: PageFetcher + 'static,
{
    Router::new()
        .route("/movie/amazon/:amazon_id", get(get_movie::<F>))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> Response {
    error_reply(StatusCode::NOT_FOUND, NOT_FOUND_PATH)
}

async fn get_movie<F>(State(state): State<AppState<F>>, Path(amazon_id): Path<String>) -> Response
where
    F: PageFetcher + 'static,
{
    tracing::debug!(amazon_id = %amazon_id, "movie requested");

    let Some(url) = state.product_url(&amazon_id) else {
        tracing::debug!(amazon_id = %amazon_id, "rejected product id");
        return error_reply(StatusCode::NOT_FOUND, NOT_FOUND_MOVIE);
    };

    let page = match state.fetcher.get_page(url.as_str()).await {
        Ok(page) => page,
        Err(e) => return fetch_failure(&amazon_id, e),
    };

    let movie = match state.extractor.extract(&page) {
        Ok(movie) => movie,
        Err(e) => {
            tracing::error!(amazon_id = %amazon_id, error = %e, "failed to parse page");
            return error_reply(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL);
        }
    };

    match serde_json::to_vec(&movie) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(amazon_id = %amazon_id, error = %e, "failed to encode movie");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
        }
    }
}

fn fetch_failure(amazon_id: &str, error: FetchError) -> Response {
    if error.is_not_found() {
        tracing::debug!(amazon_id, "movie page not found");
        return error_reply(StatusCode::NOT_FOUND, NOT_FOUND_MOVIE);
    }

    tracing::error!(amazon_id, error = %error, "failed to fetch page");
    error_reply(reply_status(error.status_code()), INTERNAL)
}

/// Backend error statuses are passed on; anything that cannot carry an error
/// body becomes 500.
fn reply_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code)
        .ok()
        .filter(|status| status.is_client_error() || status.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serve `router` on `bind` until SIGINT or SIGTERM.
pub async fn serve(bind: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening started");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "signal received, shutting down"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "signal received, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FileFetcher;

    fn state() -> AppState<FileFetcher> {
        AppState::new(
            FileFetcher::new("tests/pages"),
            AmazonPrimeExtractor::new(),
            Url::parse("https://www.amazon.de/gp/product/").unwrap(),
        )
    }

    #[test]
    fn test_product_url() {
        let state = state();
        assert_eq!(
            state.product_url("B08MZ3B1KC").unwrap().as_str(),
            "https://www.amazon.de/gp/product/B08MZ3B1KC"
        );
        assert!(state.product_url("../../etc").is_none());
        assert!(state.product_url("").is_none());
    }

    #[test]
    fn test_fetch_failure_status() {
        let response = fetch_failure("x", FetchError::Status(404));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = fetch_failure("x", FetchError::Status(503));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let response = fetch_failure("x", FetchError::TooLarge { limit: 1 });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_non_error_backend_status_becomes_internal_error() {
        for code in [100, 204, 301, 304] {
            let response = fetch_failure("x", FetchError::Status(code));
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", code);
        }
        assert_eq!(reply_status(429), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(reply_status(1000), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
