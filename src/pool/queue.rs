//! # Cola FIFO de Tareas
//! src/pool/queue.rs
//!
//! Cola thread-safe que alimenta al pool de workers. Soporta muchos
//! productores concurrentes (un thread por conexión) y exactamente
//! `num_workers` consumidores, sin perder ni duplicar tareas.
//!
//! - `enqueue` agrega al final. En modo sin límite (el default) nunca
//!   bloquea ni falla.
//! - `dequeue(timeout)` saca la cabeza. Si está vacía espera en un
//!   `Condvar` hasta `timeout` y devuelve `None`, que no es un error.
//! - `size()` es sólo para diagnóstico: se lee de un contador atómico
//!   sin tomar el lock, así que puede estar desactualizado un instante.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::PoolError;
use crate::pool::task::Task;

/// Qué hacer cuando una cola acotada está llena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// `enqueue` falla con `PoolError::QueueFull`
    #[default]
    Reject,
    /// `enqueue` espera hasta que haya espacio
    Block,
}

/// Estado protegido por el mutex
struct QueueState {
    items: VecDeque<Task>,
    closed: bool,
}

/// Cola FIFO estricta (sin prioridades)
pub struct TaskQueue {
    state: Mutex<QueueState>,

    /// Notifica a los workers que hay una tarea nueva
    not_empty: Condvar,

    /// Notifica a productores bloqueados que se liberó un slot
    not_full: Condvar,

    /// `None` = sin límite
    capacity: Option<usize>,

    policy: OverflowPolicy,

    /// Copia del largo para lecturas sin lock
    depth: AtomicUsize,
}

impl TaskQueue {
    /// Crea una cola sin límite de capacidad
    pub fn unbounded() -> Self {
        Self::build(None, OverflowPolicy::default())
    }

    /// Crea una cola acotada con la política de desborde indicada
    pub fn bounded(capacity: usize, policy: OverflowPolicy) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidQueueCapacity);
        }
        Ok(Self::build(Some(capacity), policy))
    }

    fn build(capacity: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            policy,
            depth: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Las tareas corren fuera del lock, así que un mutex envenenado
        // sólo puede venir de un panic entre push/pop: el estado sigue siendo válido.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola una tarea al final
    ///
    /// Falla sólo si la cola está cerrada o si es acotada con `Reject`
    /// y está llena.
    pub fn enqueue(&self, task: Task) -> Result<(), PoolError> {
        let mut state = self.lock();

        if let Some(capacity) = self.capacity {
            while !state.closed && state.items.len() >= capacity {
                match self.policy {
                    OverflowPolicy::Reject => return Err(PoolError::QueueFull { capacity }),
                    OverflowPolicy::Block => {
                        state = self
                            .not_full
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                }
            }
        }

        if state.closed {
            return Err(PoolError::ShutDown);
        }

        state.items.push_back(task);
        self.depth.store(state.items.len(), Ordering::Release);

        // Despertar a un worker esperando
        self.not_empty.notify_one();

        Ok(())
    }

    /// Desencola la cabeza, esperando como máximo `timeout`
    ///
    /// Devuelve `None` si no llegó ninguna tarea a tiempo o si la cola
    /// fue cerrada.
    pub fn dequeue(&self, timeout: Duration) -> Option<Task> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if state.closed {
                return None;
            }

            if let Some(task) = state.items.pop_front() {
                self.depth.store(state.items.len(), Ordering::Release);
                self.not_full.notify_one();
                return Some(task);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            let (guard, _) = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Cierra la cola y despierta a todos los que esperan
    ///
    /// Las tareas pendientes se sacan de la cola sin ejecutarse y se
    /// destruyen fuera del lock, liberando lo que capturaron (por ejemplo
    /// el socket de una conexión). Devuelve cuántas se descartaron; una
    /// segunda llamada devuelve 0.
    pub fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let pending = mem::take(&mut state.items);
        self.depth.store(0, Ordering::Release);
        drop(state);

        self.not_empty.notify_all();
        self.not_full.notify_all();

        let abandoned = pending.len();
        drop(pending);
        abandoned
    }

    /// Número de tareas pendientes (advisory, ver doc del módulo)
    pub fn size(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Verifica si no hay tareas pendientes (advisory)
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}
