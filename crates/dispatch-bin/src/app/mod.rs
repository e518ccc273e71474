//! Application wiring and command entry points.

mod commands;
mod error;
mod init;

pub use commands::{enqueue, run_once, sent};
pub use error::{AppError, AppResult};
pub use init::{build_dispatcher, open_store, run_server, scheduler_config};
