// Check-in Application Layer

pub mod commands;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod queries;
pub mod state;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::AppError;
pub use manager::CheckinManager;
pub use metrics::Metrics;
pub use state::{EngineContext, EngineState, Session, SessionSnapshot};
pub use worker::{CheckinHandle, CheckinWorker};
