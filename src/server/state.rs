//! # Estado Compartido del Servidor
//! src/server/state.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::ResponseCache;
use crate::dispatcher::Dispatcher;
use crate::metrics::ResultsStore;

/// Todo lo que los handlers comparten entre conexiones
pub struct AppState {
    pub dispatcher: Dispatcher,

    /// Páginas ya leídas de disco (camino rápido)
    pub pages: ResponseCache,

    pub public_dir: PathBuf,

    /// Trabajo simulado del camino lento
    pub slow_path: Duration,

    pub results: ResultsStore,
}

impl AppState {
    pub fn new(
        dispatcher: Dispatcher,
        public_dir: impl Into<PathBuf>,
        slow_path: Duration,
        results_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dispatcher,
            pages: ResponseCache::new(),
            public_dir: public_dir.into(),
            slow_path,
            results: ResultsStore::new(results_file),
        }
    }

    /// Estado con un pool de un worker y sin directorio público
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        use crate::cache::CacheController;
        use crate::metrics::MetricsAggregator;
        use crate::pool::WorkerPool;
        use std::sync::Arc;

        let dispatcher = Dispatcher::new(
            Arc::new(WorkerPool::new(1).unwrap()),
            Arc::new(MetricsAggregator::new()),
            Arc::new(CacheController::default()),
        );
        let scratch = std::env::temp_dir().join("threadpool-server-tests");
        Self::new(
            dispatcher,
            scratch.join("missing-public"),
            Duration::ZERO,
            scratch.join("results.json"),
        )
    }
}
