//! RSA key material used to sign and verify access tokens, and its
//! publication as a JSON Web Key.

use crate::error::CodecError;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use x509_parser::prelude::FromDer;
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

/// Key identifier used when none is configured
pub const DEFAULT_KEY_ID: &str = "legacy-token-key";

/// Built-in development key pair. Only meant for local runs and tests.
pub const DEVELOPMENT_PRIVATE_KEY: &str = include_str!("../keys/development_private.pem");
pub const DEVELOPMENT_PUBLIC_KEY: &str = include_str!("../keys/development_public.pem");

/// An RSA signing key pair tagged with its key identifier
#[derive(Clone)]
pub struct SigningKeys {
    key_id: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_pem: String,
    modulus: String,
    exponent: String,
}

impl SigningKeys {
    /// Parses a PEM encoded RSA private key and its matching public key
    pub fn from_pem(
        key_id: impl Into<String>,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, CodecError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| CodecError::InvalidKey(format!("private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| CodecError::InvalidKey(format!("public key: {e}")))?;
        let (modulus, exponent) = rsa_components(public_pem)?;

        Ok(Self {
            key_id: key_id.into(),
            encoding_key,
            decoding_key,
            public_pem: public_pem.trim().to_string(),
            modulus,
            exponent,
        })
    }

    /// The built-in development key pair under the given key identifier
    pub fn development(key_id: impl Into<String>) -> Result<Self, CodecError> {
        Self::from_pem(key_id, DEVELOPMENT_PRIVATE_KEY, DEVELOPMENT_PUBLIC_KEY)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// The verification key as published on the token key endpoints
    pub fn token_key(&self) -> TokenKey {
        TokenKey {
            kty: "RSA".to_string(),
            alg: "RS256".to_string(),
            key_use: "sig".to_string(),
            kid: self.key_id.clone(),
            value: self.public_pem.clone(),
            n: self.modulus.clone(),
            e: self.exponent.clone(),
        }
    }
}

/// A published verification key (JWK with the PEM `value` extension)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct TokenKey {
    /// Always "RSA"
    pub kty: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    /// PEM encoded public key
    pub value: String,
    /// Base64url modulus
    pub n: String,
    /// Base64url exponent
    pub e: String,
}

/// A set of published verification keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct TokenKeys {
    pub keys: Vec<TokenKey>,
}

/// Extracts the base64url modulus and exponent from a SubjectPublicKeyInfo PEM
fn rsa_components(public_pem: &str) -> Result<(String, String), CodecError> {
    let block = pem::parse(public_pem)
        .map_err(|e| CodecError::InvalidKey(format!("public key is not valid PEM: {e}")))?;
    let (_, spki) = SubjectPublicKeyInfo::from_der(block.contents())
        .map_err(|e| CodecError::InvalidKey(format!("public key is not a SubjectPublicKeyInfo: {e}")))?;

    match spki.parsed() {
        Ok(PublicKey::RSA(rsa)) => Ok((
            URL_SAFE_NO_PAD.encode(strip_leading_zeros(rsa.modulus)),
            URL_SAFE_NO_PAD.encode(strip_leading_zeros(rsa.exponent)),
        )),
        Ok(_) => Err(CodecError::InvalidKey(
            "public key is not an RSA key".to_string(),
        )),
        Err(e) => Err(CodecError::InvalidKey(format!(
            "failed to parse public key: {e}"
        ))),
    }
}

// DER integers carry a leading zero byte when the high bit is set
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
