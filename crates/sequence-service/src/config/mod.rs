//! Configuration module for the sequence generation service.
//!
//! Configuration is loaded from environment variables using the `envy`
//! crate for type-safe environment variable parsing.

mod app;

pub use app::AppConfig;
