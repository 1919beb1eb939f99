//! # Reporte de Resultados
//! src/metrics/report.rs
//!
//! Persiste snapshots de métricas en un archivo JSON (un arreglo) y
//! genera el resumen de texto de las últimas pruebas. El archivo sólo
//! guarda los últimos `MAX_RESULTS` snapshots; es la entrada del
//! gráfico de rendimiento.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::ReportError;
use crate::metrics::MetricsSnapshot;

/// Máximo de snapshots conservados en el archivo
pub const MAX_RESULTS: usize = 50;

/// Cuántos resultados recientes se listan en el resumen
const RECENT_IN_SUMMARY: usize = 5;

/// Almacén append-only y acotado de snapshots
#[derive(Debug)]
pub struct ResultsStore {
    path: PathBuf,

    /// Serializa read-modify-write entre threads del mismo proceso
    write_lock: Mutex<()>,
}

impl ResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Ruta del archivo de resultados
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Carga todos los snapshots guardados
    ///
    /// Un archivo inexistente equivale a un almacén vacío.
    pub fn load(&self) -> Result<Vec<MetricsSnapshot>, ReportError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let results = serde_json::from_reader(BufReader::new(file))?;
        Ok(results)
    }

    /// Agrega un snapshot y recorta a los últimos `MAX_RESULTS`
    ///
    /// Retorna cuántos snapshots quedaron guardados.
    pub fn append(&self, snapshot: MetricsSnapshot) -> Result<usize, ReportError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut results = self.load()?;
        results.push(snapshot);

        if results.len() > MAX_RESULTS {
            let excess = results.len() - MAX_RESULTS;
            results.drain(..excess);
        }

        self.write_all(&results)?;

        tracing::info!(path = %self.path.display(), stored = results.len(), "resultados guardados");
        Ok(results.len())
    }

    /// Escribe a un temporal y renombra (atómico en Unix)
    fn write_all(&self, results: &[MetricsSnapshot]) -> Result<(), ReportError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, results)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Genera el resumen de texto a partir del archivo
    pub fn summary(&self) -> Result<String, ReportError> {
        Ok(render_summary(&self.load()?))
    }
}

/// Construye el reporte de resumen
///
/// Promedia tiempo de respuesta y tasa de éxito sobre todas las pruebas
/// y lista las últimas cinco.
pub fn render_summary(results: &[MetricsSnapshot]) -> String {
    if results.is_empty() {
        return "No test results available.\n".to_string();
    }

    let rule = "=".repeat(70);
    let count = results.len() as f64;
    let total_requests: u64 = results.iter().map(|r| r.total_requests).sum();
    let avg_response = results.iter().map(|r| r.avg_response_time).sum::<f64>() / count;
    let avg_success = results.iter().map(|r| r.success_rate).sum::<f64>() / count;

    // write! sobre String no puede fallar
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(out, "PERFORMANCE SUMMARY REPORT");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Total Tests Run:           {}", results.len());
    let _ = writeln!(out, "Total Requests Processed:  {}", total_requests);
    let _ = writeln!(out, "Average Response Time:     {:.2}ms", avg_response * 1000.0);
    let _ = writeln!(out, "Average Success Rate:      {:.2}%", avg_success);
    let _ = writeln!(out, "\nRecent Test Results:");
    let _ = writeln!(out, "{}", "-".repeat(70));

    let start = results.len().saturating_sub(RECENT_IN_SUMMARY);
    for (i, result) in results[start..].iter().enumerate() {
        let _ = writeln!(out, "\nTest {}:", i + 1);
        let _ = writeln!(out, "  Time:              {}", result.timestamp);
        let _ = writeln!(out, "  Total Requests:    {}", result.total_requests);
        let _ = writeln!(out, "  Successful:        {}", result.successful);
        let _ = writeln!(out, "  Failed:            {}", result.failed);
        let _ = writeln!(out, "  Success Rate:      {:.2}%", result.success_rate);
        let _ = writeln!(out, "  Avg Response Time: {:.2}ms", result.avg_response_time_ms());
        let _ = writeln!(out, "  Requests/Second:   {:.2}", result.requests_per_second);
    }

    let _ = writeln!(out, "\n{}", rule);
    out
}
