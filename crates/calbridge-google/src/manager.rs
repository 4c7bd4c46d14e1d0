//! Token lifecycle: acquire, persist, detect expiry, refresh, invalidate.
//!
//! The manager keeps no token state of its own. Every call to
//! [`TokenManager::authenticate`] re-derives the situation from the store:
//!
//! ```text
//! empty store, no code      -> NeedsAuthorization(url)
//! empty store, code         -> exchange, save          -> Authenticated
//! stored, still valid       ->                            Authenticated
//! stored, expired, refresh  -> refresh, save           -> Authenticated
//!                              refresh rejected, clear -> NeedsAuthorization(url)
//! stored, expired, none     -> clear                   -> NeedsAuthorization(url)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{GoogleErrorCode, GoogleResult};
use crate::oauth::{OAuthClient, TokenEndpoint};
use crate::state::encode_state;
use crate::store::TokenStore;
use crate::token::AccessToken;

/// Result of [`TokenManager::authenticate`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// A usable token; hand it to a Calendar API client.
    Authenticated(AccessToken),
    /// The user must grant consent at this URL, then call back with the code.
    NeedsAuthorization(String),
}

impl AuthOutcome {
    /// Returns the token if authenticated.
    pub fn token(&self) -> Option<&AccessToken> {
        match self {
            Self::Authenticated(token) => Some(token),
            Self::NeedsAuthorization(_) => None,
        }
    }

    /// Returns true if a consent redirect is required.
    pub fn needs_authorization(&self) -> bool {
        matches!(self, Self::NeedsAuthorization(_))
    }
}

/// Read-only view of the store, see [`TokenManager::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TokenStatus {
    /// Nothing stored.
    Missing,
    /// A token usable until `expires_at` (`None`: no known expiry).
    Valid { expires_at: Option<DateTime<Utc>> },
    /// An expired token; `refreshable` tells whether a refresh token is stored.
    Expired { refreshable: bool },
}

/// Holds a valid bearer token for one store, refreshing or re-requesting
/// authorization as needed.
#[derive(Debug, Clone)]
pub struct TokenManager {
    endpoint: Arc<dyn TokenEndpoint>,
    store: Arc<dyn TokenStore>,
    state: Option<String>,
}

impl TokenManager {
    /// Creates a manager over an endpoint and a store.
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            endpoint,
            store,
            state: None,
        }
    }

    /// Creates a manager backed by Google's OAuth endpoint.
    pub fn from_config(config: &ClientConfig, store: Arc<dyn TokenStore>) -> GoogleResult<Self> {
        let endpoint = OAuthClient::from_config(config)?;
        Ok(Self::new(Arc::new(endpoint), store))
    }

    /// Attaches caller parameters to the consent URL as the OAuth `state`.
    pub fn with_state(mut self, params: &Value) -> Self {
        self.state = Some(encode_state(params));
        self
    }

    /// The store this manager reads and writes.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// The consent URL for this client.
    pub fn authorization_url(&self) -> GoogleResult<String> {
        self.endpoint.authorization_url(self.state.as_deref())
    }

    fn needs_authorization(&self) -> GoogleResult<AuthOutcome> {
        Ok(AuthOutcome::NeedsAuthorization(self.authorization_url()?))
    }

    /// Produces a usable token, or the URL the user must visit first.
    ///
    /// `auth_code` is only consulted when the store is empty. Empty codes
    /// count as absent.
    ///
    /// # Errors
    ///
    /// - `CredentialsCorrupt` if the store holds something unparsable
    /// - `StoreIo` if the store cannot be read or written
    /// - `AuthenticationFailed` if the authorization code is rejected
    /// - network/server errors from the token endpoint
    pub async fn authenticate(&self, auth_code: Option<&str>) -> GoogleResult<AuthOutcome> {
        let guard = self.store.refresh_guard();
        let _held = guard.lock().await;

        let Some(payload) = self.store.load()? else {
            return self.authorize_with_code(auth_code.filter(|c| !c.is_empty())).await;
        };

        let token = AccessToken::from_json(&payload)?;
        if !token.is_expired() {
            debug!("stored access token is still valid");
            return Ok(AuthOutcome::Authenticated(token));
        }

        let Some(refresh_token) = token.refresh_token() else {
            info!("access token expired and no refresh token stored, clearing store");
            self.store.clear()?;
            return self.needs_authorization();
        };

        debug!("access token expired, refreshing");
        let refreshed = match self.endpoint.refresh(refresh_token).await {
            Ok(grant) => AccessToken::from_grant(grant, Some(refresh_token), Utc::now()),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(new_token) => {
                self.store.save(&new_token.to_json()?)?;
                info!("access token refreshed");
                Ok(AuthOutcome::Authenticated(new_token))
            }
            Err(e)
                if matches!(
                    e.code(),
                    GoogleErrorCode::RefreshFailed | GoogleErrorCode::InvalidResponse
                ) =>
            {
                warn!("refresh failed, clearing stored token: {}", e);
                self.store.clear()?;
                self.needs_authorization()
            }
            Err(e) => Err(e),
        }
    }

    async fn authorize_with_code(&self, auth_code: Option<&str>) -> GoogleResult<AuthOutcome> {
        let Some(code) = auth_code else {
            debug!("no stored token and no authorization code");
            return self.needs_authorization();
        };

        let grant = self.endpoint.exchange_code(code).await?;
        let token = AccessToken::from_grant(grant, None, Utc::now())?;
        self.store.save(&token.to_json()?)?;
        info!("stored token from authorization code");
        Ok(AuthOutcome::Authenticated(token))
    }

    /// Inspects the store without contacting the endpoint or modifying anything.
    pub fn status(&self) -> GoogleResult<TokenStatus> {
        let Some(payload) = self.store.load()? else {
            return Ok(TokenStatus::Missing);
        };
        let token = AccessToken::from_json(&payload)?;
        if token.is_expired() {
            Ok(TokenStatus::Expired {
                refreshable: token.refresh_token().is_some(),
            })
        } else {
            Ok(TokenStatus::Valid {
                expires_at: token.expires_at(),
            })
        }
    }

    /// Clears the store, forcing a new consent on the next call.
    pub async fn forget(&self) -> GoogleResult<()> {
        let guard = self.store.refresh_guard();
        let _held = guard.lock().await;
        self.store.clear()?;
        info!("stored token cleared");
        Ok(())
    }
}
