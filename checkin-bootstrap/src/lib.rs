pub mod context;
pub mod lifecycle;

pub use lifecycle::{run_standalone, start_embedded, EmbeddedEngine, EventOverrides};
