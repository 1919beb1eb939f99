//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Loop de accept sobre un `WorkerPool`: cada conexión aceptada se
//! despacha como una tarea instrumentada. El thread principal sólo
//! acepta; el trabajo ocurre en los workers.
//!
//! Para detener el servidor se usa un `ShutdownHandle`: marca el flag y
//! se conecta a sí mismo para despertar el `accept` bloqueado. Al salir
//! del loop se hace `shutdown(true)` del pool.

use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheController;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{PoolError, ServerError};
use crate::http::{Response, StatusCode};
use crate::metrics::MetricsAggregator;
use crate::pool::{PoolOptions, ShutdownReport, WorkerPool};
use crate::router::Router;

use super::{connection, handlers, AppState};

/// Todo lo necesario para levantar un servidor
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// `host:port`; puerto 0 = efímero
    pub address: String,
    pub workers: usize,
    pub pool: PoolOptions,
    pub public_dir: PathBuf,
    pub slow_path: Duration,
    pub results_file: PathBuf,
    pub cache_enabled: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            workers: 10,
            pool: PoolOptions::default(),
            public_dir: PathBuf::from("public"),
            slow_path: Duration::from_millis(50),
            results_file: PathBuf::from("reports/test_results.json"),
            cache_enabled: false,
        }
    }
}

/// Detiene el loop de accept desde otro thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Pide la detención. Llamarlo más de una vez no tiene efecto.
    pub fn trigger(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        // Despierta el accept; si falla, el próximo cliente lo hará
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, Duration::from_secs(1)) {
            tracing::debug!(error = %e, "no se pudo despertar el accept");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Servidor HTTP/1.0 sobre el pool de workers
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    state: Arc<AppState>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Crea el pool y hace bind del socket
    pub fn bind(options: ServerOptions) -> Result<Self, ServerError> {
        let pool = WorkerPool::with_options(options.workers, options.pool.clone())?;
        let dispatcher = Dispatcher::new(
            Arc::new(pool),
            Arc::new(MetricsAggregator::new()),
            Arc::new(CacheController::new(options.cache_enabled)),
        );

        let listener = TcpListener::bind(&options.address).map_err(|source| ServerError::Bind {
            address: options.address.clone(),
            source,
        })?;
        let local = listener.local_addr()?;

        let state = AppState::new(
            dispatcher,
            options.public_dir,
            options.slow_path,
            options.results_file,
        );

        Ok(Self {
            listener,
            router: Arc::new(handlers::build_router()),
            state: Arc::new(state),
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
                wake_addr: wake_address(local),
            },
        })
    }

    /// Valida la configuración y hace bind
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;
        Self::bind(config.server_options())
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.state.dispatcher
    }

    /// Acepta conexiones hasta que se dispare el `ShutdownHandle`
    pub fn run(self) -> Result<ShutdownReport, ServerError> {
        let pool = Arc::clone(self.state.dispatcher.pool());
        tracing::info!(
            address = %self.local_addr()?,
            workers = pool.worker_count(),
            cache_enabled = self.state.dispatcher.cache().is_enabled(),
            "servidor escuchando"
        );

        for stream in self.listener.incoming() {
            if self.shutdown.is_triggered() {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "error al aceptar conexión");
                    continue;
                }
            };

            let overflow = stream.try_clone().ok();
            let router = Arc::clone(&self.router);
            let state = Arc::clone(&self.state);

            let dispatched = self.state.dispatcher.dispatch(move |cache_path| {
                connection::handle_connection(stream, &router, &state, cache_path)
            });

            match dispatched {
                Ok(()) => {}
                Err(PoolError::ShutDown) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "conexión rechazada");
                    if let Some(mut stream) = overflow {
                        let response = Response::error(StatusCode::ServiceUnavailable, &e.to_string())
                            .with_header("Connection", "close");
                        if let Err(e) = stream.write_all(&response.to_bytes()) {
                            tracing::debug!(error = %e, "no se pudo enviar el 503");
                        }
                    }
                }
            }
        }

        tracing::info!("deteniendo servidor");
        let report = pool.shutdown(true);
        if report.is_complete() {
            tracing::info!(joined = report.joined, abandoned = report.abandoned, "pool detenido");
        } else {
            tracing::warn!(
                joined = report.joined,
                timed_out = report.timed_out,
                abandoned = report.abandoned,
                "pool detenido sin confirmar todos los workers"
            );
        }
        Ok(report)
    }
}

/// Dirección a la que conectarse para despertar el accept
fn wake_address(local: SocketAddr) -> SocketAddr {
    let mut addr = local;
    if addr.ip().is_unspecified() {
        match addr {
            SocketAddr::V4(_) => addr.set_ip(Ipv4Addr::LOCALHOST.into()),
            SocketAddr::V6(_) => addr.set_ip(Ipv6Addr::LOCALHOST.into()),
        }
    }
    addr
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::thread;
    use std::time::Instant;

    fn options() -> ServerOptions {
        let scratch = std::env::temp_dir().join("threadpool-server-tcp-tests");
        ServerOptions {
            address: "127.0.0.1:0".to_string(),
            workers: 2,
            pool: PoolOptions {
                poll_interval: Duration::from_millis(20),
                ..PoolOptions::default()
            },
            public_dir: scratch.join("public"),
            slow_path: Duration::ZERO,
            results_file: scratch.join("results.json"),
            cache_enabled: false,
        }
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {} HTTP/1.0\r\n\r\n", path).unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_bind_invalid_address() {
        let mut opts = options();
        opts.address = "not-an-address".to_string();
        assert!(matches!(Server::bind(opts), Err(ServerError::Bind { .. })));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut opts = options();
        opts.workers = 0;
        assert!(matches!(
            Server::bind(opts),
            Err(ServerError::Pool(PoolError::InvalidWorkerCount(0)))
        ));
    }

    #[test]
    fn test_wake_address_maps_unspecified() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        assert_eq!(wake_address(addr), "127.0.0.1:9000".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(wake_address(addr), addr);
    }

    #[test]
    fn test_serve_and_shutdown() {
        let server = Server::bind(options()).unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.shutdown_handle();
        let dispatcher = server.dispatcher().clone();

        let runner = thread::spawn(move || server.run());

        let text = get(addr, "/status");
        assert!(text.contains("200 OK"));
        assert!(text.contains("\"status\":\"running\""));

        let deadline = Instant::now() + Duration::from_secs(5);
        while dispatcher.snapshot().total_requests < 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        handle.trigger();
        handle.trigger();
        let report = runner.join().unwrap().unwrap();
        assert_eq!(report.joined, 2);
        assert!(dispatcher.pool().is_shutdown());
        assert_eq!(dispatcher.snapshot().total_requests, 1);
    }
}
