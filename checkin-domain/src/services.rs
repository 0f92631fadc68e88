// Domain services

pub mod ticket_crypto;

pub use ticket_crypto::*;
