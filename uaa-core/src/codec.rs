//! Conversion between [`Token`] values and RS256-signed JWT strings.

use crate::error::CodecError;
use crate::keys::SigningKeys;
use crate::token::Token;
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use log::debug;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Signature algorithms accepted when decoding
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Signs and verifies access tokens with a single RSA key pair
#[derive(Clone)]
pub struct ClaimsCodec {
    keys: Arc<SigningKeys>,
    validation: Validation,
}

impl ClaimsCodec {
    /// Creates a codec and proves the key pair by signing and verifying a
    /// probe token, so a mismatched pair fails here instead of per request.
    pub fn new(keys: SigningKeys) -> Result<Self, CodecError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let codec = Self {
            keys: Arc::new(keys),
            validation,
        };

        let probe = Token::for_client("key-probe");
        let signed = codec.encode(&probe)?;
        if codec.decode(&signed)? != probe {
            return Err(CodecError::InvalidKey(
                "signing and verification keys do not form a pair".to_string(),
            ));
        }

        Ok(codec)
    }

    pub fn keys(&self) -> &SigningKeys {
        &self.keys
    }

    /// Signs the token's claims with RS256, tagging the header with the key id
    pub fn encode(&self, token: &Token) -> Result<String, CodecError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.key_id().to_string());

        encode(&header, &token.to_claims(), self.keys.encoding_key())
            .map_err(|e| CodecError::Signing(e.to_string()))
    }

    /// Verifies the signature and rebuilds the token from its claims
    pub fn decode(&self, signed: &str) -> Result<Token, CodecError> {
        let data = decode::<Map<String, Value>>(signed, self.keys.decoding_key(), &self.validation)
            .map_err(|e| {
                debug!("Rejected access token: {e}");
                CodecError::Decoding(e.to_string())
            })?;

        Ok(Token::from_claims(&data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{DEFAULT_KEY_ID, DEVELOPMENT_PRIVATE_KEY};
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use jsonwebtoken::EncodingKey;
    use serde_json::json;

    fn codec() -> ClaimsCodec {
        ClaimsCodec::new(SigningKeys::development(DEFAULT_KEY_ID).unwrap()).unwrap()
    }

    #[test]
    fn test_round_trip_client_token() {
        let codec = codec();
        let token = Token::for_client("notifications")
            .with_scopes(["scim.read", "notification_preferences.admin"])
            .with_authorities(["scim.read"])
            .with_audiences(["scim", "notification_preferences"])
            .with_issuer("http://localhost:8080/oauth/token");

        let signed = codec.encode(&token).unwrap();
        assert_eq!(codec.decode(&signed).unwrap(), token);
    }

    #[test]
    fn test_round_trip_user_token() {
        let codec = codec();
        let token = Token::for_user("5a2c9f8e").with_scopes(["openid"]);

        let signed = codec.encode(&token).unwrap();
        assert_eq!(codec.decode(&signed).unwrap(), token);
    }

    #[test]
    fn test_header_carries_key_id() {
        let signed = codec().encode(&Token::for_client("c1")).unwrap();
        let header = jsonwebtoken::decode_header(&signed).unwrap();

        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("legacy-token-key"));
    }

    #[test]
    fn test_accepts_rs512() {
        let codec = codec();
        let key = EncodingKey::from_rsa_pem(DEVELOPMENT_PRIVATE_KEY.as_bytes()).unwrap();
        let claims = json!({"client_id": "c1", "scope": ["a"]});
        let signed = encode(&Header::new(Algorithm::RS512), &claims, &key).unwrap();

        let token = codec.decode(&signed).unwrap();
        assert_eq!(token.client_id.as_deref(), Some("c1"));
        assert_eq!(token.scopes, vec!["a"]);
    }

    #[test]
    fn test_rejects_hmac_token() {
        let claims = json!({"client_id": "c1", "scope": []});
        let signed = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(codec().decode(&signed), Err(CodecError::Decoding(_))));
    }

    #[test]
    fn test_rejects_unsigned_token() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"client_id":"admin","scope":[]}"#);
        let signed = format!("{header}.{payload}.");

        assert!(codec().decode(&signed).is_err());
    }

    #[test]
    fn test_rejects_tampered_payload() {
        let codec = codec();
        let signed = codec
            .encode(&Token::for_client("c1").with_scopes(["scim.read"]))
            .unwrap();
        let parts: Vec<&str> = signed.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"client_id":"c1","scope":["uaa.admin"]}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert!(codec.decode(&tampered).is_err());
    }

    #[test]
    fn test_rejects_malformed_token() {
        assert!(codec().decode("not-a-jwt").is_err());
        assert!(codec().decode("").is_err());
    }
}
