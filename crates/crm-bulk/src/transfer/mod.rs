//! Chunked transfer engine.
//!
//! A logical request is split into bounded sub-requests that are issued
//! strictly in order:
//!
//! - [`planner`]: next chunk of a work queue, or next index window of a scan
//! - [`retry`]: bounded consecutive-failure retry of one chunk
//! - [`termination`]: per-operation decision to stop or continue
//! - [`session`]: the sequential loop tying them together
//!
//! Sessions share no state; independent sessions may run concurrently.

pub mod planner;
pub mod retry;
pub mod session;
pub mod termination;

pub use planner::{next_chunk, IndexWindow, WorkQueue};
pub use retry::{RetryController, RetryState, MAX_CONSECUTIVE_ERRORS};
pub use session::{SessionStats, TransferSession};
pub use termination::{PageReport, Step, TerminationPolicy};
