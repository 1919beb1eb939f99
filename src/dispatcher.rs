//! # Dispatcher
//! src/dispatcher.rs
//!
//! Punto de integración entre el servidor y el pool. Cada unidad de
//! trabajo externa (una por conexión) se envuelve en una tarea
//! instrumentada que:
//!
//! 1. Lee el flag del cache para elegir camino rápido o lento
//! 2. Mide la ejecución de principio a fin
//! 3. Decide éxito/fallo según el `TaskResult` (un panic es fallo)
//! 4. Registra el resultado en el `MetricsAggregator`
//!
//! y luego se encola en el `WorkerPool`. El dispatcher nunca llama a
//! `shutdown`: eso lo decide quien administra el proceso.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::CacheController;
use crate::error::PoolError;
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::pool::task::{self, Task, TaskResult};
use crate::pool::WorkerPool;

/// Camino elegido según el flag del cache al iniciar la tarea
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePath {
    /// Cache habilitado: se puede servir desde el cache
    Fast,
    /// Cache deshabilitado: se hace el trabajo completo
    Slow,
}

impl CachePath {
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            CachePath::Fast
        } else {
            CachePath::Slow
        }
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, CachePath::Fast)
    }
}

/// Envía trabajo instrumentado al pool
#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<WorkerPool>,
    metrics: Arc<MetricsAggregator>,
    cache: Arc<CacheController>,
}

impl Dispatcher {
    pub fn new(
        pool: Arc<WorkerPool>,
        metrics: Arc<MetricsAggregator>,
        cache: Arc<CacheController>,
    ) -> Self {
        Self {
            pool,
            metrics,
            cache,
        }
    }

    /// Instrumenta `work` y lo encola
    ///
    /// Fire-and-forget: el resultado sólo queda reflejado en las métricas.
    pub fn dispatch<F>(&self, work: F) -> Result<(), PoolError>
    where
        F: FnOnce(CachePath) -> TaskResult + Send + 'static,
    {
        self.pool.submit_task(self.instrument(work))
    }

    /// Igual que `dispatch` pero entregando un payload a `work`
    pub fn dispatch_with<A, F>(&self, work: F, payload: A) -> Result<(), PoolError>
    where
        A: Send + 'static,
        F: FnOnce(CachePath, A) -> TaskResult + Send + 'static,
    {
        self.dispatch(move |path| work(path, payload))
    }

    /// Construye la tarea instrumentada sin encolarla
    pub fn instrument<F>(&self, work: F) -> Task
    where
        F: FnOnce(CachePath) -> TaskResult + Send + 'static,
    {
        let metrics = Arc::clone(&self.metrics);
        let cache = Arc::clone(&self.cache);

        Task::new(move || {
            let path = CachePath::from_flag(cache.is_enabled());
            let start = Instant::now();

            let outcome = task::catch_panic(|| work(path));

            metrics.record(outcome.is_ok(), start.elapsed());
            outcome
        })
    }

    /// Foto de las métricas para el exportador
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Invierte el flag del cache y retorna el nuevo estado
    pub fn toggle_cache(&self) -> bool {
        self.cache.toggle()
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    pub fn cache(&self) -> &Arc<CacheController> {
        &self.cache
    }
}
