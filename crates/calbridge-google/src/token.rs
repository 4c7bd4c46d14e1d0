//! OAuth token payloads.
//!
//! The stored payload is the token endpoint's JSON response, kept verbatim
//! so provider-specific fields (`scope`, `token_type`, `id_token`, ...)
//! survive a round trip. One field is added when a grant is received:
//! `created`, the Unix time the grant was issued, which anchors
//! `expires_in`.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{GoogleError, GoogleResult};

/// Seconds before the nominal expiry at which a token counts as expired.
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Raw JSON object returned by the token endpoint.
pub type TokenGrant = Map<String, Value>;

/// A bearer token together with the payload it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    raw: TokenGrant,
}

impl AccessToken {
    /// Parses a stored payload.
    ///
    /// Anything that is not a JSON object with a non-empty `access_token`
    /// string is [`CredentialsCorrupt`](crate::GoogleErrorCode::CredentialsCorrupt).
    pub fn from_json(json: &str) -> GoogleResult<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            GoogleError::credentials_corrupt(format!("stored token is not valid JSON: {}", e))
                .with_source(e)
        })?;
        match value {
            Value::Object(raw) => Self::from_map(raw).map_err(|reason| {
                GoogleError::credentials_corrupt(format!("stored token {}", reason))
            }),
            _ => Err(GoogleError::credentials_corrupt(
                "stored token is not a JSON object",
            )),
        }
    }

    /// Builds a token from a fresh endpoint response.
    ///
    /// Stamps `created` with `now` unless the provider sent one, and carries
    /// `previous_refresh` over when the response has no refresh token of its own.
    pub fn from_grant(
        mut grant: TokenGrant,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> GoogleResult<Self> {
        if !grant.contains_key("created") {
            grant.insert("created".to_string(), Value::from(now.timestamp()));
        }
        if let Some(refresh) = previous_refresh
            && non_empty_str(&grant, "refresh_token").is_none()
        {
            grant.insert("refresh_token".to_string(), Value::from(refresh));
        }
        Self::from_map(grant)
            .map_err(|reason| GoogleError::invalid_response(format!("token response {}", reason)))
    }

    fn from_map(raw: TokenGrant) -> Result<Self, &'static str> {
        let access_token = non_empty_str(&raw, "access_token")
            .ok_or("has no access_token")?
            .to_string();
        let refresh_token = non_empty_str(&raw, "refresh_token").map(String::from);
        let expires_at = match int_field(&raw, "expires_in") {
            Some(expires_in) => Some(
                deadline(int_field(&raw, "created").unwrap_or(0), expires_in)
                    .ok_or("has an out-of-range expiry")?,
            ),
            None => None,
        };

        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
            raw,
        })
    }

    /// Serializes the payload for storage.
    pub fn to_json(&self) -> GoogleResult<String> {
        serde_json::to_string(&self.raw)
            .map_err(|e| GoogleError::internal(format!("failed to serialize token: {}", e)))
    }

    /// The bearer value for `Authorization` headers.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The refresh token, if the grant included one.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// The full stored payload.
    pub fn raw(&self) -> &TokenGrant {
        &self.raw
    }

    /// When the token stops being usable, leeway included.
    ///
    /// `None` when the payload has no `expires_in`. A payload without
    /// `created` is anchored at the Unix epoch.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns true if the token is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|deadline| deadline < now)
    }

    /// Returns true if the token is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// `created + expires_in - leeway`, or `None` if it leaves chrono's range.
fn deadline(created: i64, expires_in: i64) -> Option<DateTime<Utc>> {
    let secs = created
        .checked_add(expires_in)?
        .checked_sub(EXPIRY_LEEWAY_SECS)?;
    DateTime::from_timestamp(secs, 0)
}

fn non_empty_str<'a>(raw: &'a TokenGrant, key: &str) -> Option<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Reads an integer that some providers send as a string.
fn int_field(raw: &TokenGrant, key: &str) -> Option<i64> {
    match raw.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
