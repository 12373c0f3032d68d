//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → middleware.rs (edge router: redirect or continue)
//!     → upstream.rs (forward pass-through to origin)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;
pub mod upstream;

pub use server::{HttpServer, ServerError};
