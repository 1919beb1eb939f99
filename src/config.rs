//! # Configuración
//! src/config.rs
//!
//! Configuración del servidor y del simulador de carga, con soporte para
//! argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./threadpool_server --port 8080 --workers 10 --poll-interval-ms 200
//! ./threadpool_server load --clients 50 --mode burst --duration-secs 10
//! ./threadpool_server report
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! SERVER_PORT=8080 SERVER_WORKERS=16 CACHE_ENABLED=true ./threadpool_server
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::client::{LoadMode, LoadOptions};
use crate::error::ConfigError;
use crate::logging::LogOptions;
use crate::pool::{OverflowPolicy, PoolOptions};
use crate::server::ServerOptions;

/// Línea de comandos completa
#[derive(Debug, Clone, Parser)]
#[command(name = "threadpool_server")]
#[command(about = "Servidor HTTP sobre un pool de workers con métricas y simulador de carga")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcomandos; sin subcomando se levanta el servidor
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Levanta el servidor (por defecto)
    Serve,

    /// Genera carga contra el servidor configurado
    Load(LoadArgs),

    /// Imprime el resumen del archivo de resultados
    Report,
}

/// Configuración compartida por todos los subcomandos
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Host/IP en el que escucha el servidor
    #[arg(long, default_value = "127.0.0.1", env = "SERVER_HOST", global = true)]
    pub host: String,

    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "SERVER_PORT", global = true)]
    pub port: u16,

    // === Pool ===
    /// Número de workers del pool
    #[arg(short, long, default_value = "10", env = "SERVER_WORKERS")]
    pub workers: usize,

    /// Espera máxima de un worker por tarea antes de revisar el shutdown
    #[arg(long = "poll-interval-ms", default_value = "200", env = "POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Espera máxima por worker al hacer shutdown
    #[arg(long = "join-timeout-ms", default_value = "1000", env = "JOIN_TIMEOUT_MS")]
    pub join_timeout_ms: u64,

    /// Capacidad de la cola (0 = sin límite)
    #[arg(long = "queue-capacity", default_value = "0", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Qué hacer cuando la cola acotada está llena
    #[arg(long, value_enum, default_value = "reject", env = "QUEUE_OVERFLOW")]
    pub overflow: OverflowPolicy,

    // === Páginas y cache ===
    /// Directorio de páginas estáticas
    #[arg(long = "public-dir", default_value = "./public", env = "PUBLIC_DIR")]
    pub public_dir: PathBuf,

    /// Costo simulado del camino sin cache
    #[arg(long = "slow-path-ms", default_value = "50", env = "SLOW_PATH_MS")]
    pub slow_path_ms: u64,

    /// Arrancar con el cache habilitado
    #[arg(long = "cache-enabled", env = "CACHE_ENABLED")]
    pub cache_enabled: bool,

    // === Archivos ===
    /// Archivo JSON de snapshots guardados
    #[arg(
        long = "results-file",
        default_value = "reports/test_results.json",
        env = "RESULTS_FILE",
        global = true
    )]
    pub results_file: PathBuf,

    /// Directorio de logs
    #[arg(long = "log-dir", default_value = "logs", env = "LOG_DIR", global = true)]
    pub log_dir: PathBuf,
}

/// Parámetros del simulador de carga
#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// Número de clientes concurrentes
    #[arg(long, default_value = "50")]
    pub clients: usize,

    #[arg(long, value_enum, default_value = "continuous")]
    pub mode: LoadMode,

    /// Pausa entre requests en modo continuous
    #[arg(long = "stagger-ms", default_value = "5")]
    pub stagger_ms: u64,

    /// Duración de la prueba
    #[arg(long = "duration-secs", default_value = "5")]
    pub duration_secs: u64,

    /// Path solicitado por cada cliente
    #[arg(long, default_value = "/index.html")]
    pub path: String,
}

impl Config {
    /// Dirección completa (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(invalid("workers", "must be >= 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll-interval-ms", "must be >= 1"));
        }
        if self.join_timeout_ms == 0 {
            return Err(invalid("join-timeout-ms", "must be >= 1"));
        }
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        Ok(())
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            name: "worker".to_string(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            join_timeout: Some(Duration::from_millis(self.join_timeout_ms)),
            queue_capacity: (self.queue_capacity > 0).then_some(self.queue_capacity),
            overflow: self.overflow,
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            address: self.address(),
            workers: self.workers,
            pool: self.pool_options(),
            public_dir: self.public_dir.clone(),
            slow_path: Duration::from_millis(self.slow_path_ms),
            results_file: self.results_file.clone(),
            cache_enabled: self.cache_enabled,
        }
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_dir: Some(self.log_dir.clone()),
            ..LogOptions::default()
        }
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        let queue = if self.queue_capacity == 0 {
            "unbounded".to_string()
        } else {
            format!("{} ({:?})", self.queue_capacity, self.overflow)
        };

        tracing::info!(address = %self.address(), workers = self.workers, "configuración del servidor");
        tracing::info!(
            poll_interval_ms = self.poll_interval_ms,
            join_timeout_ms = self.join_timeout_ms,
            queue = %queue,
            "pool"
        );
        tracing::info!(
            public_dir = %self.public_dir.display(),
            slow_path_ms = self.slow_path_ms,
            cache_enabled = self.cache_enabled,
            "páginas"
        );
        tracing::info!(
            results_file = %self.results_file.display(),
            log_dir = %self.log_dir.display(),
            "archivos"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: 10,
            poll_interval_ms: 200,
            join_timeout_ms: 1000,
            queue_capacity: 0,
            overflow: OverflowPolicy::Reject,
            public_dir: PathBuf::from("./public"),
            slow_path_ms: 50,
            cache_enabled: false,
            results_file: PathBuf::from("reports/test_results.json"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl LoadArgs {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Opciones del simulador apuntando al servidor configurado
    pub fn load_options(&self, config: &Config) -> LoadOptions {
        LoadOptions {
            target: config.address(),
            clients: self.clients,
            mode: self.mode,
            stagger: Duration::from_millis(self.stagger_ms),
            path: self.path.clone(),
        }
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}
