//! # Tipos de Error
//! src/error.rs
//!
//! Errores del crate, uno por área. Los fallos de tareas individuales
//! (`TaskError`) viven en `pool::task` porque forman parte del resultado
//! de cada ejecución, no de la API del pool.

use thiserror::Error;

/// Errores del pool de workers
#[derive(Debug, Error)]
pub enum PoolError {
    /// Un pool sin workers nunca procesaría trabajo
    #[error("worker count must be >= 1 (got {0})")]
    InvalidWorkerCount(usize),

    /// Una cola acotada necesita al menos un slot
    #[error("bounded queue capacity must be >= 1")]
    InvalidQueueCapacity,

    /// Cola acotada llena con política `Reject`
    #[error("queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    /// El pool ya recibió la señal de shutdown
    #[error("pool has been shut down")]
    ShutDown,

    /// El sistema operativo no pudo crear el thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl PoolError {
    /// Verifica si el error es por cola llena
    pub fn is_queue_full(&self) -> bool {
        matches!(self, PoolError::QueueFull { .. })
    }
}

/// Errores de configuración
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Errores del almacén de resultados
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("results file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("results file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errores del servidor TCP
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errores al inicializar el logging
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("global subscriber already set: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}
