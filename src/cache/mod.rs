//! # Cache
//! src/cache/mod.rs
//!
//! - `controller`: el flag global (habilitado/deshabilitado)
//! - `store`: el contenido de las páginas, usado por el servidor

pub mod controller;
pub mod store;

pub use controller::CacheController;
pub use store::ResponseCache;
