//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod contact;
pub mod csrf_token;
pub mod health;

pub use contact::contact_handler;
pub use csrf_token::csrf_token_handler;
pub use health::health_handler;
