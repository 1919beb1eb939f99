//! # Manejo de Conexiones
//! src/server/connection.rs
//!
//! Una conexión es una unidad de trabajo: se lee un request, se rutea,
//! se escribe el response y se cierra. El resultado decide si la tarea
//! cuenta como exitosa en las métricas:
//!
//! - error de I/O o request malformado → fallo
//! - response 4xx/5xx → fallo
//! - peer que cierra sin enviar nada → éxito (no hubo request)

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use crate::dispatcher::CachePath;
use crate::http::request::find_head_end;
use crate::http::{Request, Response, StatusCode};
use crate::pool::{TaskError, TaskResult};
use crate::router::{RequestContext, Router};

use super::AppState;

/// Timeout de lectura del request
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

const BUFFER_SIZE: usize = 8192;

/// Atiende una conexión completa
pub fn handle_connection(
    mut stream: TcpStream,
    router: &Router,
    state: &AppState,
    cache_path: CachePath,
) -> TaskResult {
    let start = Instant::now();
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let mut buffer = [0u8; BUFFER_SIZE];
    let bytes_read = read_head(&mut stream, &mut buffer)?;
    if bytes_read == 0 {
        tracing::debug!("conexión cerrada sin request");
        return Ok(());
    }

    let worker = thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string();

    let mut response = match Request::parse(&buffer[..bytes_read]) {
        Ok(request) => {
            tracing::debug!(method = request.method().as_str(), path = request.path(), %worker, "request");
            let ctx = RequestContext { state, cache_path };
            router.route(&request, &ctx)
        }
        Err(e) => {
            tracing::warn!(error = %e, "request malformado");
            Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e))
                .with_header("Connection", "close")
        }
    };

    response.set_header("X-Worker-Thread", &worker);
    if response.header("X-Cache").is_none() {
        response.set_header("X-Cache", "BYPASS");
    }

    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    tracing::debug!(
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "response enviado"
    );

    if response.is_error() {
        return Err(TaskError::failed(format!("responded {}", response.status())));
    }
    Ok(())
}

/// Lee hasta completar la cabecera, hasta EOF o hasta llenar el buffer
fn read_head(stream: &mut TcpStream, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buffer.len() {
        let n = match stream.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        // El terminador puede quedar partido entre dos lecturas
        let from = filled.saturating_sub(3);
        filled += n;
        if find_head_end(&buffer[from..filled]).is_some() {
            break;
        }
    }

    Ok(filled)
}
