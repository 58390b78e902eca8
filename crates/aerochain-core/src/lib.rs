//! Aerochain Core: process configuration and shared error types.

pub mod config;
pub mod error;

pub use config::AerochainConfig;
pub use error::{Error, Result};
