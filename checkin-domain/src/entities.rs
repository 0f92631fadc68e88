// Domain entities

pub mod event_connection;
pub mod scan_log;
pub mod settings;
pub mod ticket;

pub use event_connection::*;
pub use scan_log::*;
pub use settings::*;
pub use ticket::*;
