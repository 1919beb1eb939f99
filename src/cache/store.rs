//! # Almacén de Páginas Cacheadas
//! src/cache/store.rs
//!
//! Guarda el contenido ya cargado de cada página. No decide cuándo se
//! usa: eso lo hace el handler de páginas según el `CachePath` que le
//! asigna el dispatcher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Contenido de páginas indexado por path
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Vec<u8>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Busca una página
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.lock().get(key).cloned()
    }

    /// Guarda (o reemplaza) una página y retorna el contenido compartido
    pub fn insert(&self, key: &str, body: Vec<u8>) -> Arc<Vec<u8>> {
        let body = Arc::new(body);
        self.lock().insert(key.to_string(), Arc::clone(&body));
        body
    }

    /// Número de páginas guardadas
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
