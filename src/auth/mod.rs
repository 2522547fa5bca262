//! Bearer-token authentication.
//!
//! - [`token::TokenCodec`] signs and verifies tokens.
//! - [`provider::IdentityProvider`] is the delegated credential check.
//! - [`gateway::AuthGateway`] ties both to login, refresh and identity resolution.

pub mod error;
pub mod gateway;
pub mod provider;
pub mod token;
pub mod types;

pub use error::AuthError;
pub use gateway::AuthGateway;
pub use provider::{HttpIdentityProvider, IdentityProvider};
pub use token::{TokenClaims, TokenCodec};
pub use types::{AccessToken, LoginRequest, UserIdentity};
