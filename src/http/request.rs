//! # Parsing de Requests
//! src/http/request.rs
//!
//! Parser mínimo para los requests que recibe el servidor: request line
//! y headers. El body se ignora; ninguna ruta lo necesita, y sólo la
//! cabecera tiene que ser UTF-8 válido. La query string se descarta.
//!
//! ```text
//! GET /index.html?lang=es HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```

use std::collections::HashMap;

use thiserror::Error;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
}

impl Method {
    fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
        }
    }
}

/// Errores de parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty request")]
    EmptyRequest,

    #[error("request is not valid UTF-8")]
    InvalidEncoding,

    #[error("invalid request line format")]
    InvalidRequestLine,

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

/// Request parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    /// Nombres en minúsculas
    headers: HashMap<String, String>,
    version: String,
}

impl Request {
    /// Parsea la cabecera de un request desde bytes crudos
    ///
    /// Si el buffer no contiene la línea vacía se toma completo como
    /// cabecera.
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let head = match find_head_end(buffer) {
            Some(end) => &buffer[..end],
            None => buffer,
        };
        let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidEncoding)?;
        if head.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = head.split("\r\n");

        let request_line = lines.next().ok_or(ParseError::EmptyRequest)?;
        let (method, target, version) = Self::parse_request_line(request_line)?;
        let path = match target.split_once('?') {
            Some((path, _)) => path,
            None => target,
        };

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(Self {
            method,
            path: path.to_string(),
            headers,
            version: version.to_string(),
        })
    }

    /// `METHOD /target HTTP/1.x`
    fn parse_request_line(line: &str) -> Result<(Method, &str, &str), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let &[method, target, version] = parts.as_slice() else {
            return Err(ParseError::InvalidRequestLine);
        };

        let method = Method::parse(method)?;
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version.to_string()));
        }
        if !target.starts_with('/') {
            return Err(ParseError::InvalidRequestLine);
        }

        Ok((method, target, version))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Un header, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Posición donde termina la cabecera (antes de `\r\n\r\n`), si ya llegó
pub fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}
