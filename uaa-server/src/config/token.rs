//! Token issuance configuration

use confique::Config;
use log::warn;
use uaa_core::{CodecError, SigningKeys};

/// Token issuance configuration
#[derive(Debug, Config, Clone)]
pub struct TokenConfig {
    /// Key identifier placed in the JWT header and on /token_key
    /// (default: "legacy-token-key")
    #[config(env = "UAA_TOKEN_KEY_ID", default = "legacy-token-key")]
    pub key_id: String,

    /// PEM file holding the RSA private key used to sign tokens
    #[config(env = "UAA_TOKEN_SIGNING_KEY_PATH")]
    pub signing_key_path: Option<String>,

    /// PEM file holding the matching RSA public key (SubjectPublicKeyInfo)
    #[config(env = "UAA_TOKEN_VERIFICATION_KEY_PATH")]
    pub verification_key_path: Option<String>,

    /// Audiences stamped on every issued token
    /// Comma-separated list (default: "clients,scim,password")
    #[config(env = "UAA_TOKEN_AUDIENCES", default = "clients,scim,password")]
    pub audiences: String,

    /// Scopes a user may be granted through /oauth/authorize
    /// Comma-separated list (default: "openid,scim.me")
    #[config(env = "UAA_TOKEN_DEFAULT_SCOPES", default = "openid,scim.me")]
    pub default_scopes: String,

    /// Access token validity in seconds when the client sets none
    /// (default: 43200 = 12 hours)
    #[config(env = "UAA_TOKEN_ACCESS_TOKEN_VALIDITY", default = 43200)]
    pub access_token_validity: u64,

    /// Check the HTTP Basic secret on /oauth/token (default: false)
    #[config(env = "UAA_TOKEN_VERIFY_CLIENT_SECRET", default = false)]
    pub verify_client_secret: bool,
}

impl TokenConfig {
    /// Get audiences as a vector
    pub fn get_audiences(&self) -> Vec<String> {
        split_list(&self.audiences)
    }

    /// Get default scopes as a vector
    pub fn get_default_scopes(&self) -> Vec<String> {
        split_list(&self.default_scopes)
    }

    /// Loads the configured key pair, or the built-in development pair when
    /// no key files are configured
    pub fn signing_keys(&self) -> Result<SigningKeys, CodecError> {
        match (&self.signing_key_path, &self.verification_key_path) {
            (Some(private_path), Some(public_path)) => {
                let private_pem = read_pem(private_path)?;
                let public_pem = read_pem(public_path)?;
                SigningKeys::from_pem(self.key_id.clone(), &private_pem, &public_pem)
            }
            (None, None) => {
                warn!("No signing keys configured, using the built-in development key pair");
                SigningKeys::development(self.key_id.clone())
            }
            _ => Err(CodecError::InvalidKey(
                "signing_key_path and verification_key_path must be set together".to_string(),
            )),
        }
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            key_id: "legacy-token-key".to_string(),
            signing_key_path: None,
            verification_key_path: None,
            audiences: "clients,scim,password".to_string(),
            default_scopes: "openid,scim.me".to_string(),
            access_token_validity: 43200,
            verify_client_secret: false,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn read_pem(path: &str) -> Result<String, CodecError> {
    std::fs::read_to_string(path)
        .map_err(|e| CodecError::InvalidKey(format!("failed to read {path}: {e}")))
}
