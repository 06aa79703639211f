// Credential types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Delegated OAuth1 token minted from the SSO ticket. It signs the bearer
/// exchange; the provider exposes no expiry for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Token {
    pub token: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_token: Option<String>,
}

/// Bearer access/refresh pair used to authenticate ordinary API calls.
///
/// The server reports relative lifetimes (`expires_in`,
/// `refresh_token_expires_in`); [`AccessToken::set_expirations`] converts
/// them once into the absolute `expires`/`refresh_token_expires` instants
/// (unix milliseconds). All later expiry checks compare against an injected
/// "now", never the wall clock directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(default)]
    pub scope: String,
    /// JWT ID reported by the provider.
    #[serde(default)]
    pub jti: String,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires: i64,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token_expires: i64,
    #[serde(default)]
    pub refresh_token_expires_in: i64,
}

impl AccessToken {
    /// Fixes the absolute expiry instants from the server-supplied relative
    /// lifetimes. Called exactly once, right after decoding an exchange
    /// response.
    pub(crate) fn set_expirations(&mut self, now: DateTime<Utc>) {
        self.expires = (now + Duration::seconds(self.expires_in)).timestamp_millis();
        self.refresh_token_expires =
            (now + Duration::seconds(self.refresh_token_expires_in)).timestamp_millis();
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.expires).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn refresh_expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.refresh_token_expires)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub fn is_refresh_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.refresh_expires_at()
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(expires_in: i64, refresh_in: i64) -> AccessToken {
        AccessToken {
            scope: "CONNECT_READ".to_string(),
            jti: "jti-1".to_string(),
            token_type: "Bearer".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires: 0,
            expires_in,
            refresh_token_expires: 0,
            refresh_token_expires_in: refresh_in,
        }
    }

    #[test]
    fn expirations_are_absolute_instants() {
        let now = Utc.with_ymd_and_hms(2025, 1, 12, 10, 30, 0).unwrap();
        let mut at = token(3600, 86400);
        at.set_expirations(now);

        assert_eq!(at.expires_at(), now + Duration::seconds(3600));
        assert_eq!(at.refresh_expires_at(), now + Duration::seconds(86400));
    }

    #[test]
    fn expiry_checks_use_the_supplied_now() {
        let now = Utc.with_ymd_and_hms(2025, 1, 12, 10, 30, 0).unwrap();
        let mut at = token(3600, 86400);
        at.set_expirations(now);

        assert!(!at.is_expired(now));
        assert!(!at.is_expired(now + Duration::seconds(3600)));
        assert!(at.is_expired(now + Duration::seconds(3601)));
        assert!(!at.is_refresh_expired(now + Duration::seconds(3601)));
        assert!(at.is_refresh_expired(now + Duration::seconds(86401)));
    }

    #[test]
    fn authorization_header_value() {
        let at = token(3600, 86400);
        assert_eq!(at.authorization(), "Bearer access");
    }

    #[test]
    fn wire_shape_decodes_without_absolute_fields() {
        let body = r#"{
            "scope": "CONNECT_READ CONNECT_WRITE",
            "jti": "8b7f...",
            "token_type": "Bearer",
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3599,
            "refresh_token_expires_in": 7199
        }"#;
        let at: AccessToken = serde_json::from_str(body).unwrap();
        assert_eq!(at.expires, 0);
        assert_eq!(at.expires_in, 3599);
        assert_eq!(at.refresh_token_expires_in, 7199);
    }
}
