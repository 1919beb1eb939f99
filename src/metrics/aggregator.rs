//! # Agregador de Métricas
//! src/metrics/aggregator.rs
//!
//! Contadores de requests compartidos por todos los workers. Los cuatro
//! valores (total, exitosos, fallidos, suma de latencias) viven bajo un
//! único `Mutex`, así cada `record` es una actualización atómica y cada
//! `snapshot` ve una generación consistente: nunca puede observarse
//! `successful + failed != total_requests`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Formato ISO-8601 local con microsegundos (`2024-05-01T12:30:00.123456`)
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Contadores crudos
#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    total_requests: u64,
    successful: u64,
    failed: u64,

    /// Suma de latencias en segundos
    latency_sum: f64,
}

/// Agregador thread-safe de resultados de tareas
#[derive(Debug)]
pub struct MetricsAggregator {
    counters: Mutex<Counters>,
    started_at: Instant,
}

impl MetricsAggregator {
    /// Crea un agregador vacío; la ventana de observación empieza ahora
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            started_at: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Ningún código del crate hace panic con el lock tomado
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra el resultado de una tarea terminada
    pub fn record(&self, success: bool, latency: Duration) {
        self.record_secs(success, latency.as_secs_f64());
    }

    /// Igual que `record` pero con la latencia en segundos
    ///
    /// Latencias negativas o no finitas se registran como 0.
    pub fn record_secs(&self, success: bool, latency_secs: f64) {
        let latency = if latency_secs.is_finite() && latency_secs > 0.0 {
            latency_secs
        } else {
            0.0
        };

        let mut counters = self.lock();
        counters.total_requests += 1;
        if success {
            counters.successful += 1;
        } else {
            counters.failed += 1;
        }
        counters.latency_sum += latency;
    }

    /// Toma una foto consistente de los contadores
    ///
    /// El lock se mantiene sólo para copiar los cuatro valores; los
    /// campos derivados se calculan fuera.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = *self.lock();
        let window = self.started_at.elapsed();
        MetricsSnapshot::from_counters(counters, window)
    }

    /// Tiempo desde que se creó el agregador
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Foto inmutable de las métricas
///
/// El conjunto de campos y sus unidades (segundos para latencia,
/// porcentaje 0-100 para la tasa) lo consume el reporter tal cual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Momento de la foto, ISO-8601
    pub timestamp: String,
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    /// Porcentaje 0-100
    pub success_rate: f64,
    /// Segundos
    pub avg_response_time: f64,
    pub requests_per_second: f64,
}

impl MetricsSnapshot {
    fn from_counters(counters: Counters, window: Duration) -> Self {
        let total = counters.total_requests;

        let (success_rate, avg_response_time) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                counters.successful as f64 / total as f64 * 100.0,
                counters.latency_sum / total as f64,
            )
        };

        let window_secs = window.as_secs_f64();
        let requests_per_second = if window_secs > 0.0 {
            total as f64 / window_secs
        } else {
            0.0
        };

        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            total_requests: total,
            successful: counters.successful,
            failed: counters.failed,
            success_rate,
            avg_response_time,
            requests_per_second,
        }
    }

    /// Latencia promedio en milisegundos (para reportes)
    pub fn avg_response_time_ms(&self) -> f64 {
        self.avg_response_time * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_snapshot_has_zero_rates() {
        let metrics = MetricsAggregator::new();
        let snap = metrics.snapshot();

        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.success_rate, 0.0);
        assert_eq!(snap.avg_response_time, 0.0);
        assert_eq!(snap.requests_per_second, 0.0);
    }

    #[test]
    fn test_record_updates_all_counters() {
        let metrics = MetricsAggregator::new();
        metrics.record(true, Duration::from_millis(10));
        metrics.record(true, Duration::from_millis(20));
        metrics.record(false, Duration::from_millis(30));

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 3);
        assert_eq!(snap.successful, 2);
        assert_eq!(snap.failed, 1);
        assert!((snap.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((snap.avg_response_time - 0.02).abs() < 1e-9);
        assert!((snap.avg_response_time_ms() - 20.0).abs() < 1e-6);
        assert!(snap.requests_per_second > 0.0);
    }

    #[test]
    fn test_invalid_latency_counts_as_zero() {
        let metrics = MetricsAggregator::new();
        metrics.record_secs(true, -1.0);
        metrics.record_secs(true, f64::NAN);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.avg_response_time, 0.0);
    }

    #[test]
    fn test_concurrent_records_are_not_torn() {
        let metrics = Arc::new(MetricsAggregator::new());

        let writers: Vec<_> = (0..8)
            .map(|t| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for i in 0..1000 {
                        metrics.record((t + i) % 4 != 0, Duration::from_micros(100));
                    }
                })
            })
            .collect();

        // Lecturas concurrentes: cada foto debe ser consistente
        let reader = {
            let metrics = Arc::clone(&metrics);
            thread::spawn(move || {
                for _ in 0..500 {
                    let snap = metrics.snapshot();
                    assert_eq!(snap.successful + snap.failed, snap.total_requests);
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 8000);
        assert_eq!(snap.failed, 2000);
        assert!((snap.success_rate - 75.0).abs() < 1e-9);
        assert!((snap.avg_response_time - 0.0001).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_json_field_set() {
        let metrics = MetricsAggregator::new();
        metrics.record(true, Duration::from_millis(5));

        let value = serde_json::to_value(metrics.snapshot()).unwrap();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "avg_response_time",
                "failed",
                "requests_per_second",
                "success_rate",
                "successful",
                "timestamp",
                "total_requests",
            ]
        );
    }

    #[test]
    fn test_timestamp_is_iso8601() {
        let snap = MetricsAggregator::new().snapshot();
        assert!(chrono::NaiveDateTime::parse_from_str(&snap.timestamp, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(&snap.timestamp[10..11], "T");
    }
}
