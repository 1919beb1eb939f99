//! # Simulador de Carga
//! src/client.rs
//!
//! Lanza N threads cliente que repiten "conectar, enviar `GET <path>`,
//! leer hasta 4096 bytes, cerrar" hasta que se pida detenerlos. Entre
//! requests cada cliente pausa según el modo:
//!
//! | Modo         | Pausa                                          |
//! |--------------|------------------------------------------------|
//! | `continuous` | `max(1 ms, stagger)`                           |
//! | `burst`      | uniforme entre 10 y 60 ms                      |
//! | `spike`      | 80%: uniforme entre 300 y 900 ms; si no, 5 ms  |
//!
//! Los errores de red no detienen al cliente: sólo se cuentan.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use clap::ValueEnum;
use rand::Rng;
use serde::Serialize;

/// Timeout de connect, lectura y escritura
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

const READ_LIMIT: usize = 4096;

/// Cada cuántos clientes se hace una pausa al arrancar
const STARTUP_BATCH: usize = 10;
const STARTUP_PAUSE: Duration = Duration::from_millis(20);

/// Granularidad con la que una pausa revisa la señal de stop
const STOP_CHECK: Duration = Duration::from_millis(50);

/// Patrón de carga
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LoadMode {
    #[default]
    Continuous,
    Burst,
    Spike,
}

impl LoadMode {
    /// Pausa entre dos requests del mismo cliente
    pub fn pause<R: Rng + ?Sized>(&self, stagger: Duration, rng: &mut R) -> Duration {
        match self {
            LoadMode::Continuous => stagger.max(Duration::from_millis(1)),
            LoadMode::Burst => Duration::from_millis(rng.gen_range(10..=60)),
            LoadMode::Spike => {
                if rng.gen_bool(0.8) {
                    Duration::from_millis(rng.gen_range(300..=900))
                } else {
                    Duration::from_millis(5)
                }
            }
        }
    }
}

/// Parámetros de una prueba de carga
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// `host:port` del servidor
    pub target: String,
    pub clients: usize,
    pub mode: LoadMode,
    pub stagger: Duration,
    pub path: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            target: "127.0.0.1:8080".to_string(),
            clients: 50,
            mode: LoadMode::Continuous,
            stagger: Duration::from_millis(5),
            path: "/index.html".to_string(),
        }
    }
}

/// Totales de una prueba
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadSummary {
    /// Requests que completaron el intercambio
    pub sent: u64,
    /// Requests con error de red
    pub errors: u64,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    errors: AtomicU64,
}

/// Prueba en curso
pub struct LoadHandle {
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    clients: Vec<JoinHandle<()>>,
    started_at: Instant,
}

impl LoadHandle {
    /// Totales hasta el momento
    pub fn progress(&self) -> LoadSummary {
        LoadSummary {
            sent: self.counters.sent.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Detiene a todos los clientes y espera a que terminen
    pub fn stop(self) -> LoadSummary {
        self.running.store(false, Ordering::SeqCst);
        for client in self.clients {
            if client.join().is_err() {
                tracing::warn!("un cliente terminó con panic");
            }
        }

        let summary = LoadSummary {
            sent: self.counters.sent.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        };
        tracing::info!(
            sent = summary.sent,
            errors = summary.errors,
            elapsed_secs = self.started_at.elapsed().as_secs_f64(),
            "prueba de carga terminada"
        );
        summary
    }
}

/// Arranca los clientes y retorna sin esperar
pub fn start(options: &LoadOptions) -> io::Result<LoadHandle> {
    let addr = resolve(&options.target)?;
    let request = Arc::new(format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\n\r\n",
        options.path, options.target
    ));

    let running = Arc::new(AtomicBool::new(true));
    let counters = Arc::new(Counters::default());
    let mut clients = Vec::with_capacity(options.clients);

    tracing::info!(
        server = %options.target,
        clients = options.clients,
        mode = ?options.mode,
        path = %options.path,
        "iniciando prueba de carga"
    );

    for i in 0..options.clients {
        let running_flag = Arc::clone(&running);
        let counters_ref = Arc::clone(&counters);
        let request = Arc::clone(&request);
        let mode = options.mode;
        let stagger = options.stagger;

        let spawned = thread::Builder::new()
            .name(format!("client-{}", i))
            .spawn(move || client_loop(addr, &request, mode, stagger, &running_flag, &counters_ref));

        match spawned {
            Ok(handle) => clients.push(handle),
            Err(e) => {
                // No dejar clientes huérfanos corriendo
                running.store(false, Ordering::SeqCst);
                for client in clients {
                    let _ = client.join();
                }
                return Err(e);
            }
        }

        if (i + 1) % STARTUP_BATCH == 0 {
            thread::sleep(STARTUP_PAUSE);
        }
    }

    Ok(LoadHandle {
        running,
        counters,
        clients,
        started_at: Instant::now(),
    })
}

/// Corre la prueba durante `duration` y la detiene
pub fn run_for(options: &LoadOptions, duration: Duration) -> io::Result<LoadSummary> {
    let handle = start(options)?;
    thread::sleep(duration);
    Ok(handle.stop())
}

fn resolve(target: &str) -> io::Result<SocketAddr> {
    target.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no address for {}", target),
        )
    })
}

fn client_loop(
    addr: SocketAddr,
    request: &str,
    mode: LoadMode,
    stagger: Duration,
    running: &AtomicBool,
    counters: &Counters,
) {
    let mut rng = rand::thread_rng();

    while running.load(Ordering::SeqCst) {
        match send_once(addr, request) {
            Ok(()) => counters.sent.fetch_add(1, Ordering::Relaxed),
            Err(e) => {
                tracing::trace!(error = %e, "request fallido");
                counters.errors.fetch_add(1, Ordering::Relaxed)
            }
        };

        pause(mode.pause(stagger, &mut rng), running);
    }
}

/// Un request completo; la lectura puede quedar incompleta
fn send_once(addr: SocketAddr, request: &str) -> io::Result<()> {
    let mut stream = TcpStream::connect_timeout(&addr, SOCKET_TIMEOUT)?;
    stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
    stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;

    stream.write_all(request.as_bytes())?;

    let mut buffer = [0u8; READ_LIMIT];
    let _ = stream.read(&mut buffer)?;
    Ok(())
}

/// Duerme `total` pero despierta si se pide stop
fn pause(total: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + total;
    loop {
        let now = Instant::now();
        if now >= deadline || !running.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep((deadline - now).min(STOP_CHECK));
    }
}
