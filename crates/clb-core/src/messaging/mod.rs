//! Messaging abstractions (ports + shared types).

pub mod port;
pub mod types;
