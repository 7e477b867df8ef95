use crate::config::Settings;
use std::sync::Arc;
use thiserror::Error;
use uaa_core::models::{Client, Group, User};
use uaa_core::{ClaimsCodec, CodecError, Store, Token, TokenValidator};

/// Failures that prevent the server from starting
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] confique::Error),

    #[error("Signing key error: {0}")]
    Keys(#[from] CodecError),
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub validator: TokenValidator,
    pub clients: Arc<Store<Client>>,
    pub users: Arc<Store<User>>,
    pub groups: Arc<Store<Group>>,
}

impl AppState {
    /// Loads the signing keys, proves them with the codec and seeds the stores
    pub fn new(settings: Settings) -> Result<Self, StartupError> {
        let keys = settings.token.signing_keys()?;
        let codec = ClaimsCodec::new(keys)?;

        Ok(Self {
            settings: Arc::new(settings),
            validator: TokenValidator::new(codec),
            clients: Arc::new(Store::with_seed(vec![Client::admin()])),
            users: Arc::new(Store::new()),
            groups: Arc::new(Store::new()),
        })
    }

    pub fn codec(&self) -> &ClaimsCodec {
        self.validator.codec()
    }

    /// A client token carrying the client's scope and authorities
    pub fn client_token(&self, client: &Client) -> Token {
        Token::for_client(client.id.clone())
            .with_scopes(client.scope.clone())
            .with_authorities(client.authorities.clone())
            .with_audiences(self.settings.token.get_audiences())
            .with_issuer(self.settings.issuer())
    }

    /// A user token carrying the given scopes
    pub fn user_token(&self, user: &User, scopes: Vec<String>) -> Token {
        Token::for_user(user.id.clone())
            .with_scopes(scopes)
            .with_audiences(self.settings.token.get_audiences())
            .with_issuer(self.settings.issuer())
    }

    /// Seconds until a token issued to this client expires
    pub fn token_validity(&self, client: &Client) -> u64 {
        client
            .access_token_validity
            .unwrap_or(self.settings.token.access_token_validity)
    }

    #[cfg(test)]
    pub fn for_testing(settings: &Settings) -> Self {
        Self::new(settings.clone()).expect("Failed to create test state")
    }
}
