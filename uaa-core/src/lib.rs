//! # uaa-core
//!
//! Token and identity primitives behind a UAA-compatible test double.
//!
//! ## Components
//!
//! - **Token:** The claims carried by an access token, usable as a
//!   capability requirement.
//! - **Codec:** Signs tokens as RS256 JWTs and verifies them again.
//! - **Validator:** Checks a signed token against required audiences,
//!   scopes and authorities.
//! - **Store:** Thread-safe, versioned in-memory collections.
//! - **Models:** Clients, users, groups and their validation rules.

pub mod codec;
pub mod error;
pub mod keys;
pub mod models;
pub mod store;
pub mod token;
pub mod validator;

pub use codec::ClaimsCodec;
pub use error::{CodecError, StoreError, ValidationError};
pub use keys::{DEFAULT_KEY_ID, SigningKeys, TokenKey, TokenKeys};
pub use store::{Resource, Store};
pub use token::Token;
pub use validator::TokenValidator;
