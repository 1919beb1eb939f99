//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Los códigos que usa el servidor. Todo 4xx/5xx cuenta como request
//! fallido en las métricas.

/// Códigos de estado soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok = 200,

    /// 400 Bad Request - request malformado
    BadRequest = 400,

    /// 404 Not Found - página o ruta inexistente
    NotFound = 404,

    /// 405 Method Not Allowed - la ruta existe con otro método
    MethodNotAllowed = 405,

    /// 500 Internal Server Error
    InternalServerError = 500,

    /// 503 Service Unavailable - el pool rechazó el trabajo
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Valor numérico del código
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Reason phrase estándar
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// 4xx o 5xx
    pub fn is_error(&self) -> bool {
        self.as_u16() >= 400
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
