//! Domain layer: request-independent types and the contracts of external collaborators.
//!
//! - [`clock`] - time source used by rate-limit windows
//! - [`identity`] - rate-limit identity derivation
//! - [`session`] - per-request session handle
//! - [`stores`] - counter and session store traits
//! - [`probe`] - database liveness probe
//!
//! Nothing here depends on the HTTP layer or on a concrete backend.

pub mod clock;
pub mod identity;
pub mod probe;
pub mod session;
pub mod stores;
