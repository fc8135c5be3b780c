pub mod handlers;
mod scheduler;

pub use scheduler::{RefreshHandler, RefreshScheduler, RefreshStatus, RefreshTrigger};
