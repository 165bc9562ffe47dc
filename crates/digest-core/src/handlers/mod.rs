//! Phase Handlers: one pure-ish procedure per `DailyTask` phase.
//!
//! Each handler is entered only if the task is in the matching phase and
//! commits exactly one phase transition on success.

pub mod aggregate;
pub mod context;
pub mod fetch_list;
pub mod process_batch;
pub mod terminal;

pub use context::{HandlerConfig, HandlerContext};
