//! OAuth 2.0 authorization-code flow against Google's token endpoint.
//!
//! The host application sends the user to [`TokenEndpoint::authorization_url`],
//! receives the one-time code on its redirect URI, and hands it back to the
//! token manager, which calls [`TokenEndpoint::exchange_code`]. Later,
//! expired access tokens are renewed with [`TokenEndpoint::refresh`].

use std::fmt;

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::BoxFuture;
use crate::config::{ClientConfig, ClientSecret};
use crate::error::{GoogleError, GoogleResult};
use crate::token::TokenGrant;

/// The token endpoint capability the token manager depends on.
pub trait TokenEndpoint: Send + Sync + fmt::Debug {
    /// Builds the consent URL, embedding `state` when given.
    fn authorization_url(&self, state: Option<&str>) -> GoogleResult<String>;

    /// Exchanges a one-time authorization code for a token grant.
    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, GoogleResult<TokenGrant>>;

    /// Exchanges a refresh token for a new grant.
    ///
    /// A provider rejection (revoked or unknown refresh token) is reported as
    /// [`RefreshFailed`](crate::GoogleErrorCode::RefreshFailed).
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, GoogleResult<TokenGrant>>;
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenErrorBody {
    fn describe(&self) -> String {
        match self.error_description {
            Some(ref description) => format!("{}: {}", self.error, description),
            None => self.error.clone(),
        }
    }
}

/// Which grant a token request carries; decides how rejections are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrantKind {
    AuthorizationCode,
    RefreshToken,
}

/// Google OAuth client for web-server and installed applications.
///
/// Requests offline access so the first grant includes a refresh token.
#[derive(Debug)]
pub struct OAuthClient {
    secret: ClientSecret,
    scope: String,
    redirect_uri: Option<String>,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client from a configuration, loading its client secret file.
    pub fn from_config(config: &ClientConfig) -> GoogleResult<Self> {
        config.validate().map_err(GoogleError::configuration)?;
        let secret = ClientSecret::from_file(&config.client_secret_path)?;
        Self::new(secret, config)
    }

    /// Creates a client from an already loaded secret.
    pub fn new(secret: ClientSecret, config: &ClientConfig) -> GoogleResult<Self> {
        secret
            .validate()
            .map_err(|e| GoogleError::configuration(format!("invalid client secret: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.application_name.clone())
            .build()
            .map_err(|e| {
                GoogleError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        let redirect_uri = config
            .redirect_uri
            .clone()
            .or_else(|| secret.redirect_uris.first().cloned());

        Ok(Self {
            secret,
            scope: config.scope_param(),
            redirect_uri,
            http_client,
        })
    }

    /// The redirect URI sent with consent and code-exchange requests.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    async fn request_grant(
        &self,
        kind: GrantKind,
        params: &[(&str, &str)],
    ) -> GoogleResult<TokenGrant> {
        debug!("requesting {:?} grant from {}", kind, self.secret.token_uri);

        let response = self
            .http_client
            .post(&self.secret.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GoogleError::network("token request timed out")
                } else {
                    GoogleError::network(format!("token request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GoogleError::network(format!("failed to read token response: {}", e)))?;

        if status.is_server_error() {
            return Err(GoogleError::server(format!(
                "token endpoint error ({}): {}",
                status, body
            )));
        }

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorBody>(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            return Err(match kind {
                GrantKind::RefreshToken => {
                    warn!("refresh token rejected ({})", status);
                    GoogleError::refresh_failed(format!("refresh rejected ({}): {}", status, reason))
                }
                GrantKind::AuthorizationCode => GoogleError::authentication(format!(
                    "authorization code rejected ({}): {}",
                    status, reason
                )),
            });
        }

        let grant: TokenGrant = serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("invalid token response: {}", e))
        })?;

        // Some servers answer 200 with an error object.
        if let Ok(error) = serde_json::from_str::<TokenErrorBody>(&body) {
            return Err(match kind {
                GrantKind::RefreshToken => GoogleError::refresh_failed(error.describe()),
                GrantKind::AuthorizationCode => GoogleError::authentication(error.describe()),
            });
        }

        if !grant.get("access_token").is_some_and(|v| v.is_string()) {
            return Err(match kind {
                GrantKind::RefreshToken => {
                    GoogleError::refresh_failed("refresh response has no access_token")
                }
                GrantKind::AuthorizationCode => {
                    GoogleError::invalid_response("token response has no access_token")
                }
            });
        }

        Ok(grant)
    }
}

impl TokenEndpoint for OAuthClient {
    fn authorization_url(&self, state: Option<&str>) -> GoogleResult<String> {
        let mut url = Url::parse(&self.secret.auth_uri).map_err(|e| {
            GoogleError::configuration(format!("invalid auth_uri {}: {}", self.secret.auth_uri, e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("access_type", "offline")
                .append_pair("client_id", &self.secret.client_id);
            if let Some(ref redirect_uri) = self.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            if let Some(state) = state {
                query.append_pair("state", state);
            }
            query.append_pair("scope", &self.scope);
        }

        Ok(url.into())
    }

    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, GoogleResult<TokenGrant>> {
        Box::pin(async move {
            let mut params = vec![
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
            ];
            if let Some(ref redirect_uri) = self.redirect_uri {
                params.push(("redirect_uri", redirect_uri.as_str()));
            }

            let grant = self
                .request_grant(GrantKind::AuthorizationCode, &params)
                .await?;
            info!("exchanged authorization code for tokens");
            Ok(grant)
        })
    }

    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, GoogleResult<TokenGrant>> {
        Box::pin(async move {
            let params = [
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
            ];

            let grant = self.request_grant(GrantKind::RefreshToken, &params).await?;
            info!("refreshed access token");
            Ok(grant)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GoogleErrorCode;
    use mockito::Matcher;

    fn secret_for(server_url: &str) -> ClientSecret {
        let mut secret = ClientSecret::new("client.apps.googleusercontent.com", "shh");
        secret.token_uri = format!("{}/token", server_url);
        secret.redirect_uris = vec!["https://app.example/oauth/callback".to_string()];
        secret
    }

    fn config() -> ClientConfig {
        ClientConfig::new("calbridge-test", "/unused/secret.json")
    }

    fn query_of(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn authorization_url_requests_offline_access() {
        let client = OAuthClient::new(ClientSecret::new("id", "secret"), &config()).unwrap();
        let url = client.authorization_url(Some("e30,")).unwrap();
        assert!(url.starts_with(crate::config::GOOGLE_AUTH_URI));

        let query = query_of(&url);
        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("access_type"), Some("offline"));
        assert_eq!(get("client_id"), Some("id"));
        assert_eq!(get("state"), Some("e30,"));
        assert_eq!(get("scope"), Some(ClientConfig::DEFAULT_SCOPE));
        assert_eq!(get("redirect_uri"), None);
    }

    #[test]
    fn configured_redirect_overrides_secret() {
        let mut secret = ClientSecret::new("id", "secret");
        secret.redirect_uris = vec!["http://localhost/from-secret".to_string()];

        let from_secret = OAuthClient::new(secret.clone(), &config()).unwrap();
        assert_eq!(from_secret.redirect_uri(), Some("http://localhost/from-secret"));

        let overridden = OAuthClient::new(
            secret,
            &config().with_redirect_uri("https://app.example/cb"),
        )
        .unwrap();
        let url = overridden.authorization_url(None).unwrap();
        assert!(query_of(&url).contains(&(
            "redirect_uri".to_string(),
            "https://app.example/cb".to_string()
        )));
        assert!(!query_of(&url).iter().any(|(k, _)| k == "state"));
    }

    #[test]
    fn invalid_secret_is_configuration_error() {
        let err = OAuthClient::new(ClientSecret::new("", "secret"), &config()).unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn exchange_code_posts_authorization_code_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "code123".into()),
                Matcher::UrlEncoded("client_secret".into(), "shh".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "https://app.example/oauth/callback".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"X","expires_in":3599,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(secret_for(&server.url()), &config()).unwrap();
        let grant = client.exchange_code("code123").await.unwrap();

        assert_eq!(grant.get("access_token").and_then(|v| v.as_str()), Some("X"));
        assert_eq!(grant.get("token_type").and_then(|v| v.as_str()), Some("Bearer"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_code_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Malformed auth code."}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(secret_for(&server.url()), &config()).unwrap();
        let err = client.exchange_code("bad").await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::AuthenticationFailed);
        assert!(err.message().contains("Malformed auth code."));
    }

    #[tokio::test]
    async fn refresh_posts_refresh_token_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "R".into()),
                Matcher::UrlEncoded("client_id".into(), "client.apps.googleusercontent.com".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"B","refresh_token":"R2","expires_in":3600}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(secret_for(&server.url()), &config()).unwrap();
        let grant = client.refresh("R").await.unwrap();
        assert_eq!(grant.get("refresh_token").and_then(|v| v.as_str()), Some("R2"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_refresh_failed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(secret_for(&server.url()), &config()).unwrap();
        let err = client.refresh("R").await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::RefreshFailed);
    }

    #[tokio::test]
    async fn refresh_without_access_token_is_refresh_failed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let client = OAuthClient::new(secret_for(&server.url()), &config()).unwrap();
        let err = client.refresh("R").await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::RefreshFailed);
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let client = OAuthClient::new(secret_for(&server.url()), &config()).unwrap();
        let err = client.refresh("R").await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::ServerError);
        assert!(err.is_retryable());
    }
}
