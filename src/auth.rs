//! Access gating.
//!
//! Every user-facing operation sits behind an [`AccessGate`]. The trait is
//! the seam: the shipped [`SharedSecretGate`] is a single shared-secret
//! check (comparison happens over SHA-256 digests, not the raw secret), and
//! a deployment wanting real authentication swaps the implementation.
//!
//! The gate fails closed: with no secret configured at all, nothing
//! authorizes.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::config::Config;

/// Environment variable consulted when `[auth] secret` is not set.
pub const SECRET_ENV_VAR: &str = "CCHAT_ACCESS_SECRET";

pub trait AccessGate: Send + Sync {
    /// Check a supplied secret. `false` halts the session.
    fn authorize(&self, supplied: &str) -> bool;
}

/// Shared-secret gate. Stores only the digest of the configured secret.
pub struct SharedSecretGate {
    digest: [u8; 32],
}

impl SharedSecretGate {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }
}

impl AccessGate for SharedSecretGate {
    fn authorize(&self, supplied: &str) -> bool {
        let supplied: [u8; 32] = Sha256::digest(supplied.as_bytes()).into();
        supplied == self.digest
    }
}

/// Build the gate from configuration, falling back to the environment.
/// Errors when no secret is available anywhere: the gate never defaults
/// open.
pub fn gate_from_config(config: &Config) -> Result<Box<dyn AccessGate>> {
    let secret = match &config.auth.secret {
        Some(s) => s.clone(),
        None => std::env::var(SECRET_ENV_VAR).with_context(|| {
            format!(
                "No access secret configured: set [auth] secret or the {} environment variable",
                SECRET_ENV_VAR
            )
        })?,
    };
    Ok(Box::new(SharedSecretGate::new(&secret)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_secret_authorizes() {
        let gate = SharedSecretGate::new("open sesame");
        assert!(gate.authorize("open sesame"));
    }

    #[test]
    fn wrong_secret_denied() {
        let gate = SharedSecretGate::new("open sesame");
        assert!(!gate.authorize("open Sesame"));
        assert!(!gate.authorize(""));
        assert!(!gate.authorize("open sesame "));
    }
}
