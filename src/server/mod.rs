//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor de demostración sobre el pool de workers:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones y despacha cada una como tarea
//! 3. Rutea el request y escribe el response desde el worker
//! 4. El resultado de cada conexión alimenta las métricas

pub mod connection;
pub mod handlers;
pub mod state;
pub mod tcp;

pub use state::AppState;
pub use tcp::{Server, ServerOptions, ShutdownHandle};
