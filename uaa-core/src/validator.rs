use crate::codec::ClaimsCodec;
use crate::token::Token;
use log::debug;

/// Decodes signed tokens and checks them against a capability requirement
#[derive(Clone)]
pub struct TokenValidator {
    codec: ClaimsCodec,
}

impl TokenValidator {
    pub fn new(codec: ClaimsCodec) -> Self {
        Self { codec }
    }

    /// Returns true when `signed` decodes and carries at least the
    /// audiences, scopes and authorities of `expected`. Never panics: a
    /// token that fails to decode is simply invalid.
    pub fn validate(&self, signed: &str, expected: &Token) -> bool {
        match self.codec.decode(signed) {
            Ok(token) => token.satisfies(expected),
            Err(e) => {
                debug!("Token validation failed: {e}");
                false
            }
        }
    }

    pub fn codec(&self) -> &ClaimsCodec {
        &self.codec
    }
}
