//! Edge redirect router for a content-managed website.

pub mod admin;
pub mod config;
pub mod edge;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::EdgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
