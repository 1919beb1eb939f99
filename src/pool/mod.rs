//! # Pool de Workers
//! src/pool/mod.rs
//!
//! Sustrato de concurrencia del servidor: una cola FIFO compartida y un
//! conjunto fijo de threads que la drenan.
//!
//! ```text
//!   submit() ──▶ ┌───────────────┐
//!   submit() ──▶ │   TaskQueue   │ ──dequeue(T)──▶ Worker 0
//!   submit() ──▶ │ (FIFO, Mutex  │ ──dequeue(T)──▶ Worker 1
//!                │  + Condvar)   │ ──dequeue(T)──▶ ...
//!                └───────────────┘ ──dequeue(T)──▶ Worker N-1
//! ```
//!
//! - `task`: la unidad de trabajo y su resultado
//! - `queue`: la cola thread-safe con espera acotada
//! - `worker`: el pool, su shutdown y su estado

pub mod queue;
pub mod task;
pub mod worker;

pub use queue::{OverflowPolicy, TaskQueue};
pub use task::{Task, TaskError, TaskResult};
pub use worker::{PoolOptions, PoolState, ShutdownReport, WorkerPool};
