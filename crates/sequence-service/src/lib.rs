//! Sequence Generation Service
//!
//! HTTP front end for the sequence engine:
//!
//! - **Sequence Generation**: Next atom and possible future for an observation
//! - **Observation Digest**: Remaining time, offsets and invoice for one observation
//! - **Program Digest**: Additive digest over a set of observations
//!
//! ## Architecture
//!
//! The service is stateless. Every request carries the observation's
//! configuration, ITC result and execution history. Generation is CPU bound
//! and runs on the blocking pool so it never stalls the async workers.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`error`]: Custom error types with Axum integration
//! - [`handlers`]: HTTP route handlers
//! - [`router`]: Route table shared by the binary and the tests
//! - [`state`]: Shared application state
//!
//! ## Example
//!
//! ```ignore
//! use seqgen_service::{config::AppConfig, router::build_router, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//!     let app = build_router(AppState::new(config));
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod result_ext;
pub mod router;
pub mod state;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;
