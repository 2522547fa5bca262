//! Identity and credential types exchanged with clients and the identity provider.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An authenticated user. Equality compares the email only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub email: String,
    /// Any further profile fields returned by the identity provider.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl UserIdentity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            attributes: Map::new(),
        }
    }
}

impl PartialEq for UserIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
    }
}

impl Eq for UserIdentity {}

/// Credential payload submitted to the login route.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token response of the login and refresh routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

impl AccessToken {
    pub fn bearer(token: String) -> Self {
        Self {
            access_token: token,
            token_type: "bearer".to_string(),
        }
    }
}
