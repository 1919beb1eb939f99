//! # Thread Pool Server
//! src/lib.rs
//!
//! Pool de workers de tamaño fijo con métricas de ejecución y un flag de
//! cache conmutable en tiempo de ejecución, más un servidor HTTP/1.0 de
//! demostración y un simulador de carga para ejercitarlo.
//!
//! ## Arquitectura
//!
//! - `pool`: cola FIFO, tareas y workers con shutdown cooperativo
//! - `metrics`: agregación de contadores y archivo de resultados
//! - `cache`: flag del cache y cache de páginas
//! - `dispatcher`: instrumenta cada tarea y la encola
//! - `http`, `router`, `server`: el servidor sobre el pool
//! - `client`: simulador de carga
//! - `config`, `logging`, `error`: infraestructura
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use threadpool_server::pool::WorkerPool;
//!
//! let pool = WorkerPool::new(4).unwrap();
//! pool.submit(|| Ok(())).unwrap();
//! let report = pool.shutdown(true);
//! assert!(report.is_complete());
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod pool;
pub mod router;
pub mod server;

pub use cache::CacheController;
pub use dispatcher::{CachePath, Dispatcher};
pub use error::PoolError;
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use pool::{TaskError, TaskResult, WorkerPool};
