pub mod http_remote_client;

pub use http_remote_client::*;
