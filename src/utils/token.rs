//! Random token generation for CSRF tokens and session ids.

/// Number of random bytes in a CSRF token (256 bits).
pub const CSRF_TOKEN_BYTES: usize = 32;

/// Number of random bytes in a session id.
pub const SESSION_ID_BYTES: usize = 24;

/// Generates `len` bytes from the operating system CSPRNG, hex-encoded.
///
/// The output is `2 * len` lowercase hex characters.
///
/// # Panics
///
/// Panics if the system random number generator fails (extremely rare).
pub fn generate_hex_token(len: usize) -> String {
    let mut buffer = vec![0u8; len];

    getrandom::fill(&mut buffer).expect("Failed to generate random bytes");

    hex::encode(buffer)
}
