//! Credential lifecycle: login, expiry tracking, refresh.
//!
//! The [`TokenManager`] owns the one [`Credential`] of a run and hands
//! out bearer tokens to every other component, so "refresh before use"
//! is enforced in exactly one place.

use chrono::{DateTime, Duration, Utc};

use crate::error::{AuthError, Result};
use crate::provider::ProviderClient;

/// Token bundle, immutable until replaced wholesale by a refresh.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// True when the token will expire within `margin` from now.
    pub fn is_near_expiry(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

/// Owns the credential and the provider transport.
pub struct TokenManager {
    provider: ProviderClient,
    credential: Option<Credential>,
    refresh_margin: Duration,
}

impl TokenManager {
    pub fn new(provider: ProviderClient) -> Self {
        Self {
            provider,
            credential: None,
            // refresh this long before nominal expiry
            refresh_margin: Duration::seconds(60),
        }
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Perform the provider login and store the resulting credential.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let credential = self.provider.authenticate(username, password).await?;
        self.credential = Some(credential);
        Ok(())
    }

    /// Refresh the credential if it is near expiry; no-op otherwise.
    /// Both tokens may rotate; the replacement is a single struct swap.
    /// A rejected refresh is fatal -- there is no silent re-login.
    pub async fn ensure_fresh(&mut self) -> Result<()> {
        let near_expiry = match &self.credential {
            Some(c) => c.is_near_expiry(self.refresh_margin),
            None => return Err(AuthError::NotAuthenticated.into()),
        };
        if !near_expiry {
            return Ok(());
        }

        let refresh_token = match &self.credential {
            Some(c) => c.refresh_token.clone(),
            None => return Err(AuthError::NotAuthenticated.into()),
        };
        let credential = self.provider.refresh(&refresh_token).await?;
        self.credential = Some(credential);
        Ok(())
    }

    /// Current bearer token, refreshed first when near expiry. All
    /// authenticated provider calls obtain their token here.
    pub async fn bearer(&mut self) -> Result<String> {
        self.ensure_fresh().await?;
        match &self.credential {
            Some(c) => Ok(c.access_token.clone()),
            None => Err(AuthError::NotAuthenticated.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_expiry_respects_margin() {
        let credential = Credential {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: Utc::now() + Duration::seconds(30),
        };
        assert!(credential.is_near_expiry(Duration::seconds(60)));
        assert!(!credential.is_near_expiry(Duration::seconds(5)));
    }

    #[tokio::test]
    async fn bearer_without_login_is_an_error() {
        let mut manager = TokenManager::new(ProviderClient::new("http://localhost:9"));
        let err = manager.bearer().await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Auth(AuthError::NotAuthenticated)
        ));
    }
}
