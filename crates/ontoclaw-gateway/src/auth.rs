//! Gateway access check
//!
//! Only a SHA-256 digest of the configured token is kept in memory. Client
//! tokens are hashed the same way and the fixed-size digests are compared in
//! equal time.

use ontoclaw_core::{AuthConfig, AuthMode, Error, Result};
use sha2::{Digest, Sha256};

fn token_digest(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

fn digests_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Clone, Debug)]
pub enum ResolvedAuth {
    /// Every connection is trusted.
    Open,
    /// Clients must present the token; `None` when none is configured.
    Token(Option<Vec<u8>>),
}

impl ResolvedAuth {
    /// Environment overrides are already folded into `config` by
    /// [`ontoclaw_core::OntoclawConfig::with_env_overrides`]. An empty token
    /// counts as unset.
    pub fn from_config(config: &AuthConfig) -> Self {
        match config.mode {
            AuthMode::None => Self::Open,
            AuthMode::Token => Self::Token(
                config
                    .token
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .map(token_digest),
            ),
        }
    }

    pub fn verify_token(&self, provided: Option<&str>) -> Result<()> {
        let expected = match self {
            Self::Open => return Ok(()),
            Self::Token(expected) => expected
                .as_deref()
                .ok_or_else(|| Error::auth_failed("no token configured"))?,
        };
        let provided = provided.ok_or_else(|| Error::auth_failed("token required"))?;
        if digests_match(expected, &token_digest(provided)) {
            Ok(())
        } else {
            Err(Error::auth_failed("invalid token"))
        }
    }

    /// Token mode with nothing to compare against.
    pub fn locked_out(&self) -> bool {
        matches!(self, Self::Token(None))
    }

    /// Connections start authenticated when no token is required.
    pub fn open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_auth(token: Option<&str>) -> ResolvedAuth {
        ResolvedAuth::from_config(&AuthConfig {
            mode: AuthMode::Token,
            token: token.map(String::from),
        })
    }

    #[test]
    fn token_must_match() {
        let auth = token_auth(Some("s3cret-ontology"));
        assert!(auth.verify_token(Some("s3cret-ontology")).is_ok());
        assert!(auth.verify_token(Some("s3cret-ontolog")).is_err());
        assert!(auth.verify_token(None).is_err());
        assert!(!auth.open());
        assert!(!auth.locked_out());
    }

    #[test]
    fn open_mode_accepts_anyone() {
        let auth = ResolvedAuth::from_config(&AuthConfig {
            mode: AuthMode::None,
            token: Some("ignored".into()),
        });
        assert!(auth.verify_token(None).is_ok());
        assert!(auth.verify_token(Some("anything")).is_ok());
        assert!(auth.open());
    }

    #[test]
    fn missing_or_empty_token_locks_everyone_out() {
        for auth in [token_auth(None), token_auth(Some(""))] {
            assert!(auth.locked_out());
            assert!(auth.verify_token(Some("")).is_err());
            assert!(auth.verify_token(Some("guess")).is_err());
        }
    }
}
