//! # Tareas del Pool
//! src/pool/task.rs
//!
//! Una `Task` es una unidad de trabajo opaca: un closure sin argumentos
//! que se ejecuta una sola vez y devuelve un `TaskResult`. La cola es
//! dueña de la tarea hasta que un worker la reclama; después el worker
//! la consume al ejecutarla. Nunca se reintenta ni se re-encola.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

/// Resultado de ejecutar una tarea
pub type TaskResult = Result<(), TaskError>;

/// Detalle de por qué falló una tarea
///
/// Los fallos se quedan dentro del worker: se registran y se exponen
/// para diagnóstico, pero nunca terminan el thread.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// La tarea devolvió un error explícito
    #[error("task failed: {0}")]
    Failed(String),

    /// La tarea hizo panic durante la ejecución
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Crea un error de tarea con un mensaje
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }

    /// Verifica si el fallo vino de un panic
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    /// Convierte el payload de un panic en un mensaje legible
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        TaskError::Panicked(message)
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        TaskError::Failed(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        TaskError::Failed(message.to_string())
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::Failed(err.to_string())
    }
}

/// Ejecuta `f` convirtiendo un panic en `TaskError::Panicked`
pub fn catch_panic<F>(f: F) -> TaskResult
where
    F: FnOnce() -> TaskResult,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::from_panic(payload)),
    }
}

type Job = Box<dyn FnOnce() -> TaskResult + Send + 'static>;

/// Unidad de trabajo encolada en el pool
pub struct Task {
    job: Job,
}

impl Task {
    /// Crea una tarea a partir de un closure
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        Self { job: Box::new(f) }
    }

    /// Crea una tarea que recibe un payload al ejecutarse
    ///
    /// Equivale a `submit(func, *args)`: el payload viaja con la tarea
    /// y se entrega a `f` en el worker.
    pub fn with_payload<A, F>(f: F, payload: A) -> Self
    where
        A: Send + 'static,
        F: FnOnce(A) -> TaskResult + Send + 'static,
    {
        Self::new(move || f(payload))
    }

    /// Ejecuta la tarea consumiéndola
    ///
    /// Un panic dentro del closure se reporta como `TaskError::Panicked`.
    pub fn run(self) -> TaskResult {
        catch_panic(self.job)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}
