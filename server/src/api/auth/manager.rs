//! Session lifecycle management

use crate::core::config::AuthConfig;
use crate::utils::crypto::generate_signing_key;

use super::jwt::{JwtError, SessionClaims, create_session_token, validate_session_token};

/// Manages JWT sessions
///
/// With no configured secret the signing key is random per process, so
/// sessions do not survive a restart.
pub struct AuthManager {
    signing_key: Vec<u8>,
    enabled: bool,
}

impl AuthManager {
    pub fn init(config: &AuthConfig) -> Self {
        let signing_key = match &config.jwt_secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::debug!("No JWT secret configured, generating a per-process key");
                generate_signing_key()
            }
        };

        if !config.enabled {
            tracing::warn!("Authentication is DISABLED, every request acts as admin");
        }

        Self {
            signing_key,
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Issue a session token for a user
    pub fn create_session(&self, user_id: &str, role: &str) -> anyhow::Result<String> {
        create_session_token(&self.signing_key, user_id, role)
    }

    /// Validate a session token and return its claims
    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, JwtError> {
        validate_session_token(token, &self.signing_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(enabled: bool) -> AuthManager {
        AuthManager::init(&AuthConfig {
            enabled,
            jwt_secret: Some("test-secret".to_string()),
        })
    }

    #[test]
    fn issues_and_validates_sessions() {
        let mgr = manager(true);
        let token = mgr.create_session("u1", "editor").unwrap();
        let claims = mgr.validate_session(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, "editor");
    }

    #[test]
    fn configured_secret_is_stable_across_instances() {
        let token = manager(true).create_session("u1", "member").unwrap();
        assert!(manager(true).validate_session(&token).is_ok());
    }

    #[test]
    fn random_keys_differ_between_instances() {
        let a = AuthManager::init(&AuthConfig {
            enabled: true,
            jwt_secret: None,
        });
        let b = AuthManager::init(&AuthConfig {
            enabled: true,
            jwt_secret: None,
        });
        let token = a.create_session("u1", "member").unwrap();
        assert!(b.validate_session(&token).is_err());
    }
}
