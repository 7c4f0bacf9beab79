//! HTTP adapter
//!
//! Thin axum layer over `Economy`. Identity is assumed verified upstream; the
//! request body or path carries the numeric player id.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
