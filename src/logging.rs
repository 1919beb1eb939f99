//! # Logging
//! src/logging.rs
//!
//! Subscriber de `tracing` con dos salidas: consola y `<log_dir>/server.log`
//! (sin colores). El nivel se controla con `RUST_LOG`; por defecto `info`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::LoggingError;

/// Nombre del archivo de log dentro de `log_dir`
pub const LOG_FILE: &str = "server.log";

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// `None` = sólo consola
    pub log_dir: Option<PathBuf>,

    /// Filtro cuando `RUST_LOG` no está definido
    pub default_filter: String,

    /// Colores en consola
    pub ansi: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_filter: "info".to_string(),
            ansi: true,
        }
    }
}

/// Ruta del archivo de log para un directorio
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE)
}

/// Instala el subscriber global
///
/// Falla si ya había uno instalado.
pub fn init(options: &LogOptions) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_filter));

    let file_layer = match &options.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path(dir))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_thread_names(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_ansi(options.ansi)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
