//! Auth Gateway: token issuance and bearer-token identity resolution.
//!
//! A login attempt first tries the local developer rule, then the
//! delegated identity provider. Sessions are stateless: a token is valid
//! until it expires, and refresh simply re-issues for the same identity.

use std::sync::Arc;
use std::time::Duration;

use super::error::AuthError;
use super::provider::{HttpIdentityProvider, IdentityProvider};
use super::token::{TokenClaims, TokenCodec, DEFAULT_TOKEN_TTL};
use super::types::{AccessToken, LoginRequest, UserIdentity};
use crate::config::{AuthConfig, DevCredentials};

pub struct AuthGateway {
    codec: TokenCodec,
    token_ttl: Duration,
    dev_credentials: Option<DevCredentials>,
    provider: Option<Arc<dyn IdentityProvider>>,
}

impl AuthGateway {
    /// Gateway with neither login path enabled.
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            token_ttl: DEFAULT_TOKEN_TTL,
            dev_credentials: None,
            provider: None,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let mut gateway = Self::new(TokenCodec::from_config(config)?).with_token_ttl(config.token_ttl);
        if let Some(dev) = &config.dev_credentials {
            tracing::warn!(email = %dev.email, "Local development login enabled");
            gateway = gateway.with_dev_credentials(dev.clone());
        }
        if let Some(provider) = HttpIdentityProvider::from_config(config)? {
            tracing::info!(url = %provider.login_url(), "Delegating logins to identity provider");
            gateway = gateway.with_provider(Arc::new(provider));
        }
        Ok(gateway)
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_dev_credentials(mut self, credentials: DevCredentials) -> Self {
        self.dev_credentials = Some(credentials);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    fn local_match(&self, credentials: &LoginRequest) -> Option<UserIdentity> {
        let dev = self.dev_credentials.as_ref()?;
        (dev.email == credentials.email && dev.password == credentials.password)
            .then(|| UserIdentity::new(dev.email.clone()))
    }

    /// Resolve credentials to an identity via the local rule, then the provider.
    pub async fn authenticate(&self, credentials: &LoginRequest) -> Option<UserIdentity> {
        if let Some(user) = self.local_match(credentials) {
            return Some(user);
        }
        match &self.provider {
            Some(provider) => provider.authenticate(credentials).await,
            None => None,
        }
    }

    /// Authenticate and issue a token.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AccessToken, AuthError> {
        match self.authenticate(credentials).await {
            Some(user) => {
                tracing::info!(email = %user.email, "Login succeeded");
                self.issue_token(&user)
            }
            None => {
                tracing::warn!(email = %credentials.email, "Login failed");
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Sign a fresh token for `user`.
    pub fn issue_token(&self, user: &UserIdentity) -> Result<AccessToken, AuthError> {
        let claims = TokenClaims::for_user(user, Some(self.token_ttl));
        self.codec.encode(&claims).map(AccessToken::bearer)
    }

    /// Identity behind a bearer token. Every protected route goes through here.
    pub fn current_user(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let claims = self.codec.decode(token)?;
        if claims.email.is_empty() || claims.sub != claims.email {
            return Err(AuthError::Unauthorized);
        }
        Ok(UserIdentity::new(claims.email))
    }

    /// Validate `token` and re-issue one with a fresh expiration.
    pub fn refresh(&self, token: &str) -> Result<AccessToken, AuthError> {
        let user = self.current_user(token)?;
        self.issue_token(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jsonwebtoken::Algorithm;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        answer: Option<UserIdentity>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn authenticate(&self, _credentials: &LoginRequest) -> Option<UserIdentity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn gateway() -> AuthGateway {
        AuthGateway::new(TokenCodec::new("test-secret", Algorithm::HS256).unwrap())
    }

    fn dev() -> DevCredentials {
        DevCredentials {
            email: "test@test.de".into(),
            password: "test".into(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_local_match_issues_token() {
        let gateway = gateway().with_dev_credentials(dev());
        let token = gateway.login(&login("test@test.de", "test")).await.unwrap();
        assert_eq!(token.token_type, "bearer");
        assert!(!token.access_token.is_empty());
        let user = gateway.current_user(&token.access_token).unwrap();
        assert_eq!(user, UserIdentity::new("test@test.de"));
    }

    #[tokio::test]
    async fn test_local_match_skips_provider() {
        let stub = Arc::new(StubProvider {
            answer: None,
            calls: AtomicUsize::new(0),
        });
        let gateway = gateway()
            .with_dev_credentials(dev())
            .with_provider(stub.clone());
        assert!(gateway.login(&login("test@test.de", "test")).await.is_ok());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_provider() {
        let stub = Arc::new(StubProvider {
            answer: Some(UserIdentity::new("remote@idp.org")),
            calls: AtomicUsize::new(0),
        });
        let gateway = gateway()
            .with_dev_credentials(dev())
            .with_provider(stub.clone());
        let token = gateway.login(&login("remote@idp.org", "pw")).await.unwrap();
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            gateway.current_user(&token.access_token).unwrap().email,
            "remote@idp.org"
        );
    }

    #[tokio::test]
    async fn test_no_path_matches() {
        let stub = Arc::new(StubProvider {
            answer: None,
            calls: AtomicUsize::new(0),
        });
        let with_both = gateway().with_dev_credentials(dev()).with_provider(stub);
        assert!(matches!(
            with_both.login(&login("test@test.de", "wrong")).await,
            Err(AuthError::Unauthorized)
        ));
        let with_neither = gateway();
        assert!(matches!(
            with_neither.login(&login("test@test.de", "test")).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_delegated_rejection_via_http() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"message": "error"}"#)
            .create_async()
            .await;

        let mut config = AuthConfig::with_secret("test-secret");
        config.backend_url = Some(server.url());
        let gateway = AuthGateway::from_config(&config).unwrap();
        assert!(matches!(
            gateway.login(&login("test@test.de", "test")).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_refresh_issues_new_token() {
        let gateway = gateway();
        let first = gateway.issue_token(&UserIdentity::new("a@b.c")).unwrap();
        let second = gateway.refresh(&first.access_token).unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_eq!(
            gateway.current_user(&second.access_token).unwrap().email,
            "a@b.c"
        );
        assert!(matches!(gateway.refresh("123"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_claims_without_matching_subject_are_unauthorized() {
        let gateway = gateway();
        let mut claims = TokenClaims::for_user(&UserIdentity::new("a@b.c"), None);
        claims.sub = "someone-else".into();
        let token = gateway.codec().encode(&claims).unwrap();
        assert!(matches!(
            gateway.current_user(&token),
            Err(AuthError::Unauthorized)
        ));
    }
}
