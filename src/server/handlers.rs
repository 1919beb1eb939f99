//! # Handlers HTTP
//! src/server/handlers.rs
//!
//! Rutas del servidor de demostración:
//!
//! | Ruta                 | Descripción                                   |
//! |----------------------|-----------------------------------------------|
//! | `GET /metrics`       | Snapshot de métricas en JSON                  |
//! | `GET /toggle_cache`  | Invierte el flag del cache                    |
//! | `GET /status`        | Estado del pool y del cache                   |
//! | `POST /save_results` | Guarda el snapshot actual en el archivo       |
//! | cualquier otra       | Página estática desde el directorio público   |

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::thread;

use serde_json::json;

use crate::http::{Method, Request, Response, StatusCode};
use crate::router::{RequestContext, Router};

/// Router con todas las rutas del servidor
pub fn build_router() -> Router {
    let mut router = Router::new();
    router.register(Method::Get, "/metrics", metrics_handler);
    router.register(Method::Get, "/toggle_cache", toggle_cache_handler);
    router.register(Method::Get, "/status", status_handler);
    router.register(Method::Post, "/save_results", save_results_handler);
    router.set_fallback(page_handler);
    router
}

pub fn metrics_handler(_req: &Request, ctx: &RequestContext<'_>) -> Response {
    Response::json(StatusCode::Ok, &ctx.state.dispatcher.snapshot())
}

pub fn toggle_cache_handler(_req: &Request, ctx: &RequestContext<'_>) -> Response {
    let enabled = ctx.state.dispatcher.toggle_cache();
    Response::json(StatusCode::Ok, &json!({ "cache_enabled": enabled }))
}

pub fn status_handler(_req: &Request, ctx: &RequestContext<'_>) -> Response {
    let dispatcher = &ctx.state.dispatcher;
    let pool = dispatcher.pool();

    Response::json(
        StatusCode::Ok,
        &json!({
            "status": pool.state().as_str(),
            "workers": pool.worker_count(),
            "live_workers": pool.live_workers(),
            "queue_size": pool.queue_size(),
            "cache_enabled": dispatcher.cache().is_enabled(),
            "cached_pages": ctx.state.pages.len(),
            "uptime_secs": dispatcher.metrics().uptime().as_secs_f64(),
        }),
    )
}

pub fn save_results_handler(_req: &Request, ctx: &RequestContext<'_>) -> Response {
    let snapshot = ctx.state.dispatcher.snapshot();
    match ctx.state.results.append(snapshot) {
        Ok(stored) => Response::json(StatusCode::Ok, &json!({ "saved": true, "stored": stored })),
        Err(e) => {
            tracing::error!(error = %e, "no se pudieron guardar los resultados");
            Response::error(StatusCode::InternalServerError, &e.to_string())
        }
    }
}

/// Páginas estáticas
///
/// Camino rápido: se sirve desde el cache y se llena en un miss.
/// Camino lento: se simula trabajo y se lee siempre de disco.
pub fn page_handler(req: &Request, ctx: &RequestContext<'_>) -> Response {
    if req.method() == Method::Post {
        return Response::error(StatusCode::MethodNotAllowed, "pages only accept GET");
    }

    let Some(relative) = page_path(req.path()) else {
        return Response::error(StatusCode::NotFound, "page not found");
    };
    let key = relative.to_string_lossy().into_owned();
    let state = ctx.state;

    if ctx.cache_path.is_fast() {
        if let Some(body) = state.pages.get(&key) {
            return page_response(&relative, body.to_vec(), "HIT");
        }
        return match load_page(&state.public_dir, &relative) {
            Some(body) => {
                let body = state.pages.insert(&key, body);
                page_response(&relative, body.to_vec(), "MISS")
            }
            None => Response::error(StatusCode::NotFound, "page not found").with_header("X-Cache", "MISS"),
        };
    }

    thread::sleep(state.slow_path);
    match load_page(&state.public_dir, &relative) {
        Some(body) => page_response(&relative, body, "BYPASS"),
        None => Response::error(StatusCode::NotFound, "page not found").with_header("X-Cache", "BYPASS"),
    }
}

/// Path relativo dentro del directorio público
///
/// `/` equivale a `index.html`. Cualquier componente que no sea un
/// nombre normal (`..`, raíz, prefijo) se rechaza.
fn page_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let relative = if trimmed.is_empty() { "index.html" } else { trimmed };

    let relative = Path::new(relative);
    if relative.components().all(|c| matches!(c, Component::Normal(_))) {
        Some(relative.to_path_buf())
    } else {
        None
    }
}

/// Lee la página; si falta `index.html` se genera una por defecto
fn load_page(public_dir: &Path, relative: &Path) -> Option<Vec<u8>> {
    match fs::read(public_dir.join(relative)) {
        Ok(body) => Some(body),
        Err(e) if e.kind() == ErrorKind::NotFound && relative == Path::new("index.html") => {
            Some(default_index().into_bytes())
        }
        Err(e) => {
            tracing::debug!(path = %relative.display(), error = %e, "página no disponible");
            None
        }
    }
}

fn page_response(relative: &Path, body: Vec<u8>, cache: &str) -> Response {
    Response::new(StatusCode::Ok)
        .with_header("Content-Type", content_type(relative))
        .with_header("X-Cache", cache)
        .with_body(body)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn default_index() -> String {
    concat!(
        "<!DOCTYPE html>\n",
        "<html>\n",
        "<head><title>Thread Pool Server</title></head>\n",
        "<body>\n",
        "<h1>Thread Pool Server</h1>\n",
        "<p>Endpoints: <a href=\"/metrics\">/metrics</a>, ",
        "<a href=\"/status\">/status</a>, ",
        "<a href=\"/toggle_cache\">/toggle_cache</a></p>\n",
        "</body>\n",
        "</html>\n",
    )
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheController;
    use crate::dispatcher::{CachePath, Dispatcher};
    use crate::metrics::MetricsAggregator;
    use crate::pool::WorkerPool;
    use crate::server::AppState;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn state_in(dir: &TempDir) -> AppState {
        let dispatcher = Dispatcher::new(
            Arc::new(WorkerPool::new(2).unwrap()),
            Arc::new(MetricsAggregator::new()),
            Arc::new(CacheController::default()),
        );
        AppState::new(
            dispatcher,
            dir.path().join("public"),
            Duration::from_millis(1),
            dir.path().join("reports").join("results.json"),
        )
    }

    fn call(handler: crate::router::Handler, raw: &[u8], state: &AppState, cache_path: CachePath) -> Response {
        let request = Request::parse(raw).unwrap();
        handler(&request, &RequestContext { state, cache_path })
    }

    fn json_body(response: &Response) -> serde_json::Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[test]
    fn test_toggle_cache() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);

        let first = call(toggle_cache_handler, b"GET /toggle_cache HTTP/1.0\r\n\r\n", &state, CachePath::Slow);
        assert_eq!(json_body(&first), json!({ "cache_enabled": true }));

        let second = call(toggle_cache_handler, b"GET /toggle_cache HTTP/1.0\r\n\r\n", &state, CachePath::Slow);
        assert_eq!(json_body(&second), json!({ "cache_enabled": false }));
    }

    #[test]
    fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);

        let response = call(status_handler, b"GET /status HTTP/1.0\r\n\r\n", &state, CachePath::Slow);
        let body = json_body(&response);
        assert_eq!(body["status"], "running");
        assert_eq!(body["workers"], 2);
        assert_eq!(body["queue_size"], 0);
        assert_eq!(body["cache_enabled"], false);
    }

    #[test]
    fn test_metrics_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);
        state.dispatcher.metrics().record(true, Duration::from_millis(10));

        let response = call(metrics_handler, b"GET /metrics HTTP/1.0\r\n\r\n", &state, CachePath::Slow);
        let body = json_body(&response);
        assert_eq!(body["total_requests"], 1);
        assert_eq!(body["successful"], 1);
    }

    #[test]
    fn test_save_results() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);

        let raw = b"POST /save_results HTTP/1.0\r\n\r\n";
        let first = call(save_results_handler, raw, &state, CachePath::Slow);
        assert_eq!(json_body(&first), json!({ "saved": true, "stored": 1 }));

        let second = call(save_results_handler, raw, &state, CachePath::Slow);
        assert_eq!(json_body(&second)["stored"], 2);
        assert_eq!(state.results.load().unwrap().len(), 2);
    }

    #[test]
    fn test_generated_index_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);

        let response = call(page_handler, b"GET / HTTP/1.0\r\n\r\n", &state, CachePath::Slow);
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("X-Cache"), Some("BYPASS"));
        assert!(String::from_utf8_lossy(response.body()).contains("Thread Pool Server"));
    }

    #[test]
    fn test_fast_path_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(dir.path().join("public").join("about.html"), "<p>about</p>").unwrap();
        let state = state_in(&dir);

        let raw = b"GET /about.html HTTP/1.0\r\n\r\n";
        let miss = call(page_handler, raw, &state, CachePath::Fast);
        assert_eq!(miss.header("X-Cache"), Some("MISS"));
        assert_eq!(miss.body(), b"<p>about</p>");

        // El cache no se invalida aunque cambie el archivo
        fs::write(dir.path().join("public").join("about.html"), "<p>changed</p>").unwrap();

        let hit = call(page_handler, raw, &state, CachePath::Fast);
        assert_eq!(hit.header("X-Cache"), Some("HIT"));
        assert_eq!(hit.body(), b"<p>about</p>");

        let slow = call(page_handler, raw, &state, CachePath::Slow);
        assert_eq!(slow.header("X-Cache"), Some("BYPASS"));
        assert_eq!(slow.body(), b"<p>changed</p>");
    }

    #[test]
    fn test_missing_page_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir);

        let response = call(page_handler, b"GET /missing.html HTTP/1.0\r\n\r\n", &state, CachePath::Fast);
        assert_eq!(response.status(), StatusCode::NotFound);
        assert!(state.pages.is_empty());
    }

    #[test]
    fn test_page_path_rejects_traversal() {
        assert_eq!(page_path("/"), Some(PathBuf::from("index.html")));
        assert_eq!(page_path("/css/site.css"), Some(PathBuf::from("css/site.css")));
        assert_eq!(page_path("/../etc/passwd"), None);
        assert_eq!(page_path("/a/../../b"), None);
    }
}
