//! # Pool de Workers
//! src/pool/worker.rs
//!
//! Conjunto fijo de N threads que drenan la `TaskQueue` compartida.
//!
//! ## Ciclo de vida
//!
//! ```text
//! CREATED ──new()──▶ RUNNING ──shutdown()──▶ STOPPING ──(todos salen)──▶ STOPPED
//! ```
//!
//! - Los workers se crean en `new()` (arranque eager) y nunca se
//!   reemplazan ni se redimensionan.
//! - Cada worker repite `dequeue(poll_interval)` hasta ver la señal de
//!   shutdown. Un fallo o panic de la tarea se registra y el worker sigue.
//! - `shutdown(wait)` es best-effort: deja de entregar tareas, y con
//!   `wait = true` hace join de cada worker con timeout individual.
//!   Las tareas que nunca se desencolaron no se ejecutan.
//! - No hay transición de STOPPED a RUNNING.

use std::mem;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::PoolError;
use crate::pool::queue::{OverflowPolicy, TaskQueue};
use crate::pool::task::{Task, TaskResult};

/// Espera máxima de cada `dequeue` antes de revisar la señal de shutdown
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Timeout de join por worker durante el shutdown
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Opciones de construcción del pool
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Prefijo de los nombres de thread (`<name>-<id>`)
    pub name: String,

    pub poll_interval: Duration,

    /// `None` = esperar indefinidamente a cada worker
    pub join_timeout: Option<Duration>,

    /// `None` = cola sin límite (comportamiento por defecto)
    pub queue_capacity: Option<usize>,

    pub overflow: OverflowPolicy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            name: "worker".to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            join_timeout: Some(DEFAULT_JOIN_TIMEOUT),
            queue_capacity: None,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// Estado observable del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Running,
    Stopping,
    Stopped,
}

impl PoolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolState::Running => "running",
            PoolState::Stopping => "stopping",
            PoolState::Stopped => "stopped",
        }
    }
}

/// Resultado de `shutdown`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Workers que terminaron dentro del timeout
    pub joined: usize,

    /// Workers que no confirmaron su salida a tiempo
    pub timed_out: usize,

    /// Tareas que seguían en la cola y se descartaron sin ejecutarse
    pub abandoned: usize,
}

impl ShutdownReport {
    /// `true` si todos los workers confirmaron su salida
    pub fn is_complete(&self) -> bool {
        self.timed_out == 0
    }
}

/// Estado compartido entre el pool y sus workers
struct Shared {
    queue: TaskQueue,
    shutdown: AtomicBool,
    live: AtomicUsize,
    exit_lock: Mutex<()>,
    exited: Condvar,
}

impl Shared {
    fn lock_exit(&self) -> MutexGuard<'_, ()> {
        self.exit_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle de un worker
struct Worker {
    id: usize,
    handle: JoinHandle<()>,
    exited: Arc<AtomicBool>,
}

/// Marca la salida de un worker aunque el loop termine por panic
struct ExitGuard {
    shared: Arc<Shared>,
    exited: Arc<AtomicBool>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let _guard = self.shared.lock_exit();
        self.exited.store(true, Ordering::Release);
        self.shared.live.fetch_sub(1, Ordering::AcqRel);
        self.shared.exited.notify_all();
    }
}

/// Pool de workers de tamaño fijo
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<Worker>>,
    worker_count: usize,
    options: PoolOptions,
}

impl WorkerPool {
    /// Crea un pool con opciones por defecto
    ///
    /// Falla si `num_workers == 0`: un pool vacío aceptaría tareas que
    /// nunca se procesan.
    pub fn new(num_workers: usize) -> Result<Self, PoolError> {
        Self::with_options(num_workers, PoolOptions::default())
    }

    /// Crea un pool e inicia inmediatamente `num_workers` threads
    pub fn with_options(num_workers: usize, options: PoolOptions) -> Result<Self, PoolError> {
        if num_workers == 0 {
            return Err(PoolError::InvalidWorkerCount(num_workers));
        }

        let queue = match options.queue_capacity {
            Some(capacity) => TaskQueue::bounded(capacity, options.overflow)?,
            None => TaskQueue::unbounded(),
        };

        let shared = Arc::new(Shared {
            queue,
            shutdown: AtomicBool::new(false),
            live: AtomicUsize::new(0),
            exit_lock: Mutex::new(()),
            exited: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            match Self::spawn_worker(id, &shared, &options) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    // Detener los que ya arrancaron antes de reportar el fallo
                    shared.shutdown.store(true, Ordering::Release);
                    shared.queue.close();
                    return Err(err);
                }
            }
        }

        tracing::info!(
            pool = %options.name,
            workers = num_workers,
            capacity = ?options.queue_capacity,
            poll_ms = options.poll_interval.as_millis() as u64,
            "pool de workers iniciado"
        );

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            worker_count: num_workers,
            options,
        })
    }

    fn spawn_worker(
        id: usize,
        shared: &Arc<Shared>,
        options: &PoolOptions,
    ) -> Result<Worker, PoolError> {
        let exited = Arc::new(AtomicBool::new(false));
        let guard = ExitGuard {
            shared: Arc::clone(shared),
            exited: Arc::clone(&exited),
        };
        let loop_shared = Arc::clone(shared);
        let poll_interval = options.poll_interval;

        shared.live.fetch_add(1, Ordering::AcqRel);

        let spawned = thread::Builder::new()
            .name(format!("{}-{}", options.name, id))
            .spawn(move || {
                let _guard = guard;
                Self::worker_loop(id, &loop_shared, poll_interval);
            });

        match spawned {
            Ok(handle) => Ok(Worker { id, handle, exited }),
            // El closure (y su guard) se descartó, lo que ya descontó `live`
            Err(err) => Err(PoolError::Spawn(err)),
        }
    }

    /// Loop principal del worker
    fn worker_loop(id: usize, shared: &Shared, poll_interval: Duration) {
        tracing::debug!(worker = id, "worker iniciado");

        while !shared.shutdown.load(Ordering::Acquire) {
            let Some(task) = shared.queue.dequeue(poll_interval) else {
                continue;
            };

            if let Err(err) = task.run() {
                tracing::warn!(worker = id, error = %err, "tarea fallida, el worker sigue activo");
            }
        }

        tracing::debug!(worker = id, "worker detenido");
    }

    /// Encola un closure para ejecución asíncrona (fire-and-forget)
    ///
    /// Nunca bloquea con la cola por defecto. Sólo falla si el pool ya
    /// recibió shutdown, o si la cola es acotada con `Reject` y está llena.
    pub fn submit<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        self.submit_task(Task::new(f))
    }

    /// Encola un closure junto con su payload
    pub fn submit_with<A, F>(&self, f: F, payload: A) -> Result<(), PoolError>
    where
        A: Send + 'static,
        F: FnOnce(A) -> TaskResult + Send + 'static,
    {
        self.submit_task(Task::with_payload(f, payload))
    }

    /// Encola una tarea ya construida
    pub fn submit_task(&self, task: Task) -> Result<(), PoolError> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::ShutDown);
        }
        self.shared.queue.enqueue(task)
    }

    /// Tareas pendientes en la cola
    ///
    /// Advisory: se lee sin el lock de la cola y puede quedar
    /// desactualizado al instante. No usar para decisiones de control.
    pub fn queue_size(&self) -> usize {
        self.shared.queue.size()
    }

    /// Número de workers configurado
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Número de workers cuyo loop sigue vivo
    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }

    /// Verifica si ya se pidió el shutdown
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Estado actual del pool
    pub fn state(&self) -> PoolState {
        if !self.is_shutdown() {
            PoolState::Running
        } else if self.live_workers() > 0 {
            PoolState::Stopping
        } else {
            PoolState::Stopped
        }
    }

    /// Opciones con las que se construyó el pool
    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Señala el shutdown y, si `wait`, espera a los workers
    ///
    /// Las tareas en ejecución no se interrumpen. Con `wait = true` cada
    /// worker se espera como máximo `join_timeout`; los que no salen a
    /// tiempo se cuentan en `timed_out` y quedan desacoplados. Las tareas
    /// que seguían en la cola se descartan y se cuentan en `abandoned`.
    /// Llamadas posteriores no vuelven a esperar y reportan 0 abandonadas.
    pub fn shutdown(&self, wait: bool) -> ShutdownReport {
        let first = !self.shared.shutdown.swap(true, Ordering::AcqRel);
        let abandoned = self.shared.queue.close();

        if first {
            tracing::info!(
                pool = %self.options.name,
                abandoned,
                wait,
                "shutdown del pool solicitado"
            );
        }

        let mut report = ShutdownReport {
            abandoned,
            ..ShutdownReport::default()
        };

        if !wait {
            return report;
        }

        let workers = mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if self.wait_for_exit(&worker.exited, self.options.join_timeout) {
                if worker.handle.join().is_err() {
                    tracing::warn!(worker = worker.id, "el thread del worker terminó con panic");
                }
                report.joined += 1;
            } else {
                tracing::warn!(worker = worker.id, "worker no confirmó su salida a tiempo");
                report.timed_out += 1;
            }
        }

        tracing::info!(
            pool = %self.options.name,
            joined = report.joined,
            timed_out = report.timed_out,
            "pool detenido"
        );

        report
    }

    /// Espera a que un worker marque su salida, con timeout opcional
    fn wait_for_exit(&self, exited: &AtomicBool, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.shared.lock_exit();

        loop {
            if exited.load(Ordering::Acquire) {
                return true;
            }

            guard = match deadline {
                None => self
                    .shared
                    .exited
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.shared
                        .exited
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Los workers son daemonic: se les avisa pero no se espera por ellos
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.queue.close();
    }
}
