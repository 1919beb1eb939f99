//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Este módulo implementa la agregación y el reporte de métricas:
//! - Contadores de requests (total, exitosos, fallidos)
//! - Latencia promedio y throughput
//! - Persistencia de los últimos snapshots y resumen de texto

pub mod aggregator;
pub mod report;

pub use aggregator::{MetricsAggregator, MetricsSnapshot};
pub use report::ResultsStore;
