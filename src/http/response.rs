//! # Construcción de Responses
//! src/http/response.rs
//!
//! Builder de responses HTTP/1.0. Los headers se guardan en orden de
//! inserción y `Content-Length` se calcula al serializar.

use serde::Serialize;

use super::StatusCode;

/// Response HTTP
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Response vacío con el status dado
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header (builder)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Agrega o reemplaza un header
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Reemplaza el body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Response HTML
    pub fn html(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(body)
    }

    /// Response JSON a partir de cualquier valor serializable
    ///
    /// Si la serialización falla se responde 500.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body(body),
            Err(e) => {
                tracing::error!(error = %e, "no se pudo serializar el response");
                Self::error(StatusCode::InternalServerError, "serialization failed")
            }
        }
    }

    /// Response de error con cuerpo JSON `{"error": ...}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// 4xx o 5xx
    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Descarta el body conservando `Content-Length` (para HEAD)
    pub fn strip_body(&mut self) {
        let len = self.body.len().to_string();
        self.set_header("Content-Length", &len);
        self.body.clear();
    }

    /// Serializa el response completo
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.0 {}\r\n", self.status);

        if self.header("Content-Length").is_none() {
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        }
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}
