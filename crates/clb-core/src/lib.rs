//! Core domain + application logic for the Cosplay Live Bot.
//!
//! This crate is framework-agnostic. Telegram, Stripe and the translator live
//! behind ports (traits) implemented in adapter crates.

pub mod announcer;
pub mod config;
pub mod domain;
pub mod donation;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod menu;
pub mod messaging;
pub mod overlay;
pub mod ports;
pub mod security;
pub mod store;

pub use errors::{Error, Result};
