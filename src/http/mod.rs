//! HTTP front end
//!
//! An axum router that maps requests under the context path onto
//! [`LdpService`](crate::ldp::LdpService) and serves the constraints document.

mod handler;
mod server;

pub use handler::{AppState, CONSTRAINTS};
pub use server::{router, LdpServer};
