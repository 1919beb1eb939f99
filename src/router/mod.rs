//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a handlers.
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! Si el path no está registrado se usa el handler de respaldo (las
//! páginas estáticas); si tampoco hay respaldo, 404. Un path registrado
//! con otro método responde 405. `HEAD` se resuelve como `GET` sin body.

use crate::dispatcher::CachePath;
use crate::http::{Method, Request, Response, StatusCode};
use crate::server::AppState;

/// Lo que un handler ve además del request
pub struct RequestContext<'a> {
    pub state: &'a AppState,

    /// Camino decidido por el dispatcher al iniciar la tarea
    pub cache_path: CachePath,
}

/// Tipo de función handler
pub type Handler = fn(&Request, &RequestContext<'_>) -> Response;

/// Router que mapea rutas a handlers
pub struct Router {
    routes: Vec<(Method, String, Handler)>,
    fallback: Option<Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: None,
        }
    }

    /// Registra una ruta
    pub fn register(&mut self, method: Method, path: &str, handler: Handler) {
        self.routes.push((method, path.to_string(), handler));
    }

    /// Handler para todo path no registrado
    pub fn set_fallback(&mut self, handler: Handler) {
        self.fallback = Some(handler);
    }

    /// Encuentra y ejecuta el handler apropiado
    pub fn route(&self, request: &Request, ctx: &RequestContext<'_>) -> Response {
        let method = match request.method() {
            Method::Head => Method::Get,
            other => other,
        };
        let path = request.path();

        let mut path_known = false;
        let mut response = None;
        for (route_method, route_path, handler) in &self.routes {
            if route_path != path {
                continue;
            }
            path_known = true;
            if *route_method == method {
                response = Some(handler(request, ctx));
                break;
            }
        }

        let mut response = match (response, path_known, self.fallback) {
            (Some(response), _, _) => response,
            (None, true, _) => Response::error(
                StatusCode::MethodNotAllowed,
                &format!("{} not allowed on {}", request.method().as_str(), path),
            ),
            (None, false, Some(fallback)) => fallback(request, ctx),
            (None, false, None) => {
                Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
            }
        };

        if request.method() == Method::Head {
            response.strip_body();
        }
        Self::add_common_headers(&mut response);
        response
    }

    fn add_common_headers(response: &mut Response) {
        response.set_header("Server", "threadpool-server/1.0");
        response.set_header("Connection", "close");
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::AppState;

    fn ok_handler(_req: &Request, _ctx: &RequestContext<'_>) -> Response {
        Response::html(StatusCode::Ok, "ok")
    }

    fn path_handler(_req: &Request, ctx: &RequestContext<'_>) -> Response {
        let body = if ctx.cache_path.is_fast() { "fast" } else { "slow" };
        Response::html(StatusCode::Ok, body)
    }

    fn route(router: &Router, raw: &[u8]) -> Response {
        let state = AppState::for_tests();
        let ctx = RequestContext {
            state: &state,
            cache_path: CachePath::Slow,
        };
        router.route(&Request::parse(raw).unwrap(), &ctx)
    }

    #[test]
    fn test_route_found() {
        let mut router = Router::new();
        router.register(Method::Get, "/test", ok_handler);

        let response = route(&router, b"GET /test HTTP/1.0\r\n\r\n");
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Connection"), Some("close"));
    }

    #[test]
    fn test_route_not_found_without_fallback() {
        let router = Router::new();
        let response = route(&router, b"GET /nonexistent HTTP/1.0\r\n\r\n");
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_fallback() {
        let mut router = Router::new();
        router.register(Method::Get, "/test", ok_handler);
        router.set_fallback(path_handler);

        let response = route(&router, b"GET /anything.html HTTP/1.0\r\n\r\n");
        assert_eq!(response.body(), b"slow");
    }

    #[test]
    fn test_method_not_allowed() {
        let mut router = Router::new();
        router.register(Method::Post, "/save_results", ok_handler);

        let response = route(&router, b"GET /save_results HTTP/1.0\r\n\r\n");
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    #[test]
    fn test_head_strips_body() {
        let mut router = Router::new();
        router.register(Method::Get, "/test", ok_handler);

        let response = route(&router, b"HEAD /test HTTP/1.0\r\n\r\n");
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(response.body().is_empty());
        assert_eq!(response.header("Content-Length"), Some("2"));
    }
}
