//! Delegated authentication against an external identity provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::error::AuthError;
use super::types::{LoginRequest, UserIdentity};
use crate::config::AuthConfig;

/// Something that can turn submitted credentials into an identity.
///
/// Implementations never fail outward: any rejection, transport problem
/// or unparsable answer is reported as `None`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, credentials: &LoginRequest) -> Option<UserIdentity>;
}

/// Identity provider reached over HTTP.
///
/// Credentials are POSTed as JSON to the login URL; a `200 OK` whose body
/// parses as a [`UserIdentity`] is a successful login.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    login_url: String,
}

impl HttpIdentityProvider {
    pub fn new(login_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Config(e.to_string()))?;
        Ok(Self {
            client,
            login_url: login_url.into(),
        })
    }

    /// Provider for the configured backend, or `None` if no backend is set.
    pub fn from_config(config: &AuthConfig) -> Result<Option<Self>, AuthError> {
        config
            .backend_login_url()
            .map(|url| Self::new(url, config.backend_timeout))
            .transpose()
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn authenticate(&self, credentials: &LoginRequest) -> Option<UserIdentity> {
        let response = match self
            .client
            .post(&self.login_url)
            .json(credentials)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %self.login_url, error = %e, "Identity provider unreachable");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            tracing::warn!(
                url = %self.login_url,
                status = %response.status(),
                "Identity provider rejected credentials"
            );
            return None;
        }

        match response.json::<UserIdentity>().await {
            Ok(user) if !user.email.is_empty() => Some(user),
            Ok(_) => {
                tracing::warn!(url = %self.login_url, "Identity provider returned an empty email");
                None
            }
            Err(e) => {
                tracing::warn!(url = %self.login_url, error = %e, "Unparsable identity provider response");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> LoginRequest {
        LoginRequest {
            email: "test@test.de".into(),
            password: "secret".into(),
        }
    }

    #[tokio::test]
    async fn test_ok_response_yields_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "email": "test@test.de",
                "password": "secret"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"email": "test@test.de", "firstname": "Test"}"#)
            .create_async()
            .await;

        let provider = HttpIdentityProvider::new(
            format!("{}/auth/login", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let user = provider.authenticate(&credentials()).await.unwrap();
        assert_eq!(user.email, "test@test.de");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_yields_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"message": "error"}"#)
            .create_async()
            .await;

        let provider = HttpIdentityProvider::new(
            format!("{}/auth/login", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(provider.authenticate(&credentials()).await.is_none());
    }

    #[tokio::test]
    async fn test_unparsable_body_yields_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let provider = HttpIdentityProvider::new(
            format!("{}/auth/login", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(provider.authenticate(&credentials()).await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_none() {
        let provider =
            HttpIdentityProvider::new("http://127.0.0.1:9/auth/login", Duration::from_millis(500))
                .unwrap();
        assert!(provider.authenticate(&credentials()).await.is_none());
    }

    #[tokio::test]
    async fn test_silent_provider_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and hold them open without ever answering.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = HttpIdentityProvider::new(
            format!("http://{}/auth/login", addr),
            Duration::from_millis(200),
        )
        .unwrap();
        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            provider.authenticate(&credentials()),
        )
        .await
        .expect("provider call must end on its own timeout");
        assert!(outcome.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
        server.abort();
    }

    #[test]
    fn test_from_config() {
        let mut config = AuthConfig::with_secret("s");
        assert!(HttpIdentityProvider::from_config(&config).unwrap().is_none());
        config.backend_url = Some("http://idp.local".into());
        let provider = HttpIdentityProvider::from_config(&config).unwrap().unwrap();
        assert_eq!(provider.login_url(), "http://idp.local/auth/login");
    }
}
