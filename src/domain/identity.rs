//! Caller identity used as the rate-limit key.

use std::net::IpAddr;

/// Authenticated caller, inserted into request extensions by an upstream
/// authentication layer. When present it takes priority over the client address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Identity used when neither a user nor a client address is known.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Derives the rate-limit identity for a request.
///
/// - authenticated user → `user:<id>`
/// - otherwise the client IP address
/// - otherwise [`UNKNOWN_IDENTITY`], so unidentifiable callers share one budget
pub fn rate_limit_identity(user: Option<&AuthenticatedUser>, ip: Option<IpAddr>) -> String {
    match (user, ip) {
        (Some(AuthenticatedUser(id)), _) => format!("user:{}", id),
        (None, Some(ip)) => ip.to_string(),
        (None, None) => UNKNOWN_IDENTITY.to_string(),
    }
}
