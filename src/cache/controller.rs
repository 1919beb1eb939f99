//! # Control del Cache
//! src/cache/controller.rs
//!
//! Un único flag booleano compartido por todos los workers. `toggle`
//! es un flip incondicional y atómico (`fetch_xor`): dos llamadas
//! devuelven el flag a su valor original.

use std::sync::atomic::{AtomicBool, Ordering};

/// Flag que decide entre el camino rápido (cache) y el lento
#[derive(Debug, Default)]
pub struct CacheController {
    enabled: AtomicBool,
}

impl CacheController {
    /// Crea el controlador con el estado inicial indicado
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Invierte el flag y retorna el nuevo valor
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled.fetch_xor(true, Ordering::AcqRel);
        tracing::info!(cache_enabled = enabled, "cache conmutado");
        enabled
    }

    /// Estado actual del flag
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}
