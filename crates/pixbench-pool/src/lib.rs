//! pixbench-pool: interchangeable pools that run the filter pipeline over
//! a batch of images.
//!
//! Three strategies share one contract ([`Execute`]):
//!
//! - [`ProcessPool`]: worker processes spawned up front, fed in chunks.
//! - [`Executor`] + [`ProcessBackend`]: worker processes fed one task at
//!   a time by the generic executor.
//! - [`Executor`] + [`ThreadBackend`]: threads in this process, sharing
//!   one [`ExecutionContext`].
//!
//! Worker processes are this crate's [`run_worker`] loop running inside
//! whatever binary the [`WorkerLauncher`] points at.

pub mod context;
pub mod error;
pub mod executor;
pub mod input;
pub mod lifecycle;
pub mod process_pool;
pub mod protocol;
pub mod strategy;
pub mod supervisor;
pub mod task;
pub mod worker;

pub use context::{ContextMode, ExecutionContext};
pub use error::{FrameError, InputError, PoolError, TaskError};
pub use executor::{Backend, Executor, ProcessBackend, ThreadBackend, WorkerSlot};
pub use input::{list_images, load_image, save_image};
pub use lifecycle::{Lifecycle, PoolState};
pub use process_pool::{ProcessPool, chunk_size};
pub use strategy::{Dispatch, Dispatcher, Execute, Strategy, UnknownStrategy};
pub use supervisor::{WorkerHandle, WorkerLauncher};
pub use task::{Task, TaskResult};
pub use worker::run_worker;
