//! # Tessera Tasks
//!
//! Deferred work attached to a single request.
//!
//! A handler that declares a [`BackgroundTasks`] parameter receives a fresh,
//! empty collector. Whatever it queues runs after the response has been
//! handed to the client:
//!
//! - tasks run once each, in the order they were added
//! - synchronous tasks run on tokio's blocking pool so they cannot stall
//!   request handling; asynchronous tasks run on the runtime
//! - a failing task is logged and counted but never affects the response
//!   that was already sent
//!
//! ```rust
//! use tessera_tasks::BackgroundTasks;
//!
//! # tokio_test::block_on(async {
//! let tasks = BackgroundTasks::new();
//! tasks.add_task(|| {
//!     // write an audit record
//!     Ok(())
//! });
//!
//! let batch = tasks.take();
//! assert_eq!(batch.len(), 1);
//! assert_eq!(batch.run_all().await.failed, 0);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-tasks/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod collector;
mod error;

pub use collector::{BackgroundTasks, TaskBatch, TaskReport};
pub use error::{TaskError, TaskResult};
