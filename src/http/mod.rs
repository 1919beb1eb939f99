//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Lo mínimo de HTTP/1.0 que necesita el servidor de demostración:
//!
//! - Parsing de la request line y headers
//! - Construcción de responses (siempre `Connection: close`)
//! - Status codes y su clasificación éxito/error
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Length: 22\r\n
//! Content-Type: application/json\r\n
//! \r\n
//! {"cache_enabled":true}
//! ```

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
