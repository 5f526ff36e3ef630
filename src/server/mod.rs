//! HTTP control surface.
//!
//! `GET /` renders an index page, `GET /list` lists servers one per line,
//! `GET /switch?server=<endpoint>` and `GET /next` switch servers. Backend
//! calls block on file and process I/O, so they run on the blocking pool.
//! Any backend error is returned verbatim with status 500.
//!
//! There is no authentication and no XSRF protection: the listener is
//! meant for a trusted network.

pub mod index;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{info, warn};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::backend::{Backend, Switchable};
use crate::constants;
use crate::error::{Result, SwitchError};

use self::index::IndexTemplates;

type Shared = Arc<Backend>;

#[derive(Clone)]
struct AppState {
    backend: Shared,
    templates: Arc<IndexTemplates>,
}

#[derive(Debug, Deserialize)]
struct SwitchQuery {
    #[serde(default)]
    server: String,
}

/// Routes of the control surface.
///
/// # Errors
///
/// Returns [`SwitchError::Template`] if the index templates do not compile.
pub fn router(backend: Shared) -> Result<Router> {
    let state = AppState {
        backend,
        templates: Arc::new(IndexTemplates::new()?),
    };
    Ok(Router::new()
        .route("/", get(index_page))
        .route("/list", get(list))
        .route("/switch", get(switch))
        .route("/next", get(next))
        .fallback(not_found)
        .with_state(state))
}

/// Serves the control surface until Ctrl-C.
///
/// # Errors
///
/// Returns an I/O error if `listen` cannot be bound or serving fails.
pub async fn serve(listen: &str, backend: Shared) -> std::io::Result<()> {
    let app = router(backend).map_err(std::io::Error::other)?;
    let listener = TcpListener::bind(listen).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

/// Runs `call` on the blocking pool and turns its outcome into a response.
async fn blocking<F>(backend: Shared, content_type: &'static str, call: F) -> Response
where
    F: FnOnce(&Backend) -> Result<String> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || call(&backend)).await;
    match outcome {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Ok(Err(e)) => {
            warn!("request failed: {e}");
            let status = match e {
                SwitchError::Unsupported(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, [(header::CONTENT_TYPE, TEXT)], format!("{e}\n")).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, TEXT)],
            format!("{e}\n"),
        )
            .into_response(),
    }
}

async fn index_page(State(state): State<AppState>) -> Response {
    let templates = state.templates;
    blocking(state.backend, HTML, move |backend| match backend.index_view() {
        Some(view) => templates.render_relays(&view?),
        None => templates.render_list(&backend.current()?, &backend.list()?),
    })
    .await
}

async fn list(State(AppState { backend, .. }): State<AppState>) -> Response {
    blocking(backend, TEXT, |backend| {
        Ok(backend
            .list()?
            .iter()
            .map(|server| format!("{server}\n"))
            .collect())
    })
    .await
}

async fn switch(
    State(AppState { backend, .. }): State<AppState>,
    Query(query): Query<SwitchQuery>,
) -> Response {
    blocking(backend, TEXT, move |backend| {
        info!("switch to {:?} requested", query.server);
        backend.switch(&query.server)?;
        Ok(constants::MSG_OK.to_string())
    })
    .await
}

async fn next(State(AppState { backend, .. }): State<AppState>) -> Response {
    blocking(backend, TEXT, |backend| {
        info!("next server requested");
        backend.next()?;
        Ok(constants::MSG_OK.to_string())
    })
    .await
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::wireguard;
    use crate::config::WireGuardSettings;
    use crate::restart::tests::FakeRunner;
    use crate::restart::Restarter;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const CONFIG: &str = "[Peer]\nEndpoint = 1.2.3.4:51820\n#Endpoint = 5.6.7.8:51820\n";

    fn app() -> (TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let settings = WireGuardSettings {
            config_path: dir.path().join("wg0.conf"),
            interface: "wg0".to_string(),
        };
        fs::write(&settings.config_path, CONFIG).unwrap();
        let restarter = Restarter::new(Arc::new(FakeRunner::running()), Duration::ZERO, 3);
        let backend = wireguard::open(&settings, restarter).unwrap();
        (dir, router(Arc::new(Backend::WireGuard(backend))).unwrap())
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_list() {
        let (_dir, app) = app();
        let (status, body) = get(app, "/list").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1.2.3.4:51820\n5.6.7.8:51820\n");
    }

    #[tokio::test]
    async fn test_index() {
        let (_dir, app) = app();
        let (status, body) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("Current server: 1.2.3.4:51820\n"));
        assert!(body.contains("switch?server=5.6.7.8%3A51820"));
    }

    #[tokio::test]
    async fn test_switch_and_next() {
        let (dir, app) = app();
        let (status, body) = get(app.clone(), "/switch?server=5.6.7.8%3A51820").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "ok\n"));
        let content = fs::read_to_string(dir.path().join("wg0.conf")).unwrap();
        assert!(content.contains("\nEndpoint = 5.6.7.8:51820\n"));

        let (status, _) = get(app, "/next").await;
        assert_eq!(status, StatusCode::OK);
        let content = fs::read_to_string(dir.path().join("wg0.conf")).unwrap();
        assert_eq!(content, CONFIG);
    }

    #[tokio::test]
    async fn test_switch_unknown_server_is_500() {
        let (_dir, app) = app();
        let (status, body) = get(app, "/switch?server=9.9.9.9:1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "server 9.9.9.9:1 not found\n");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (_dir, app) = app();
        let (status, _) = get(app, "/favicon.ico").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
