//! Utility functions shared by the middleware and services.
//!
//! - [`client_ip`] - Client address extraction from HTTP headers
//! - [`token`] - Random hex tokens for CSRF and session ids

pub mod client_ip;
pub mod token;
