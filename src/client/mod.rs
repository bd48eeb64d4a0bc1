//! Client entry point.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Configuration holder and session factory |
//! | [`ClientBuilder`] | Fluent configuration builder |
//!
//! # Example
//!
//! ```no_run
//! use tictactoe_client::{Client, GameId, PlayerId, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder()
//!     .base_url("http://127.0.0.1:8000")
//!     .build()?;
//!
//! let (session, _events) = client.session();
//! session.connect(GameId::random(), PlayerId::guest())?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// REST companion endpoints.
mod api;

/// Fluent builder for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{BASE_URL_ENV, ClientBuilder, DEFAULT_BASE_URL};
pub use core::Client;
