// OAuth1 HMAC-SHA1 request signing
//
// Only the subset the oauth-service endpoints need: no callback, no
// verifier, no realm. Parameter normalization follows RFC 5849 section 3.4.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha1::Sha1;
use uuid::Uuid;

type HmacSha1 = Hmac<Sha1>;

pub(crate) struct Signer<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: Option<&'a str>,
    pub token_secret: Option<&'a str>,
}

impl Signer<'_> {
    /// Builds the `OAuth ...` Authorization header value for a request.
    pub fn authorization(&self, method: &str, url: &Url, now: DateTime<Utc>) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        self.authorization_with(method, url, &nonce, now.timestamp())
    }

    fn authorization_with(&self, method: &str, url: &Url, nonce: &str, timestamp: i64) -> String {
        let mut oauth: Vec<(String, String)> = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.to_string()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];
        if let Some(token) = self.token {
            oauth.push(("oauth_token".to_string(), token.to_string()));
        }

        let signature = self.sign(method, url, &oauth);
        oauth.push(("oauth_signature".to_string(), signature));
        oauth.sort();

        let fields = oauth
            .iter()
            .map(|(k, v)| format!(r#"{}="{}""#, k, encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {fields}")
    }

    fn sign(&self, method: &str, url: &Url, oauth: &[(String, String)]) -> String {
        // Signature base: oauth params plus the query string, individually
        // percent-encoded, sorted, then joined.
        let mut params: Vec<(String, String)> = oauth
            .iter()
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        for (k, v) in url.query_pairs() {
            params.push((encode(&k), encode(&v)));
        }
        params.sort();
        let param_string = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);
        let base = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(base_url.as_str()),
            encode(&param_string)
        );

        let key = format!(
            "{}&{}",
            encode(self.consumer_secret),
            encode(self.token_secret.unwrap_or(""))
        );
        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("hmac accepts any key length");
        mac.update(base.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }
}

fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer<'a>() -> Signer<'a> {
        Signer {
            consumer_key: "consumer-key",
            consumer_secret: "consumer-secret",
            token: Some("token"),
            token_secret: Some("token-secret"),
        }
    }

    #[test]
    fn header_carries_all_oauth_fields() {
        let url = Url::parse("https://connectapi.garmin.com/oauth-service/oauth/exchange/user/2.0")
            .unwrap();
        let header = signer().authorization_with("POST", &url, "nonce-1", 1_700_000_000);

        assert!(header.starts_with("OAuth "));
        assert!(header.contains(r#"oauth_consumer_key="consumer-key""#));
        assert!(header.contains(r#"oauth_nonce="nonce-1""#));
        assert!(header.contains(r#"oauth_signature_method="HMAC-SHA1""#));
        assert!(header.contains(r#"oauth_timestamp="1700000000""#));
        assert!(header.contains(r#"oauth_token="token""#));
        assert!(header.contains(r#"oauth_version="1.0""#));
        assert!(header.contains("oauth_signature="));
    }

    #[test]
    fn token_field_is_omitted_without_a_token() {
        let url = Url::parse("https://connectapi.garmin.com/oauth-service/oauth/preauthorized")
            .unwrap();
        let header = Signer {
            consumer_key: "ck",
            consumer_secret: "cs",
            token: None,
            token_secret: None,
        }
        .authorization_with("GET", &url, "n", 1);
        assert!(!header.contains("oauth_token="));
        assert!(header.contains("oauth_signature="));
    }

    #[test]
    fn signing_is_deterministic_for_fixed_inputs() {
        let url = Url::parse("https://connectapi.garmin.com/oauth-service/oauth/preauthorized?ticket=ST-1")
            .unwrap();
        let a = signer().authorization_with("GET", &url, "nonce", 42);
        let b = signer().authorization_with("GET", &url, "nonce", 42);
        assert_eq!(a, b);
    }

    #[test]
    fn query_parameters_change_the_signature() {
        let base = Url::parse("https://connectapi.garmin.com/oauth-service/oauth/preauthorized")
            .unwrap();
        let with_ticket =
            Url::parse("https://connectapi.garmin.com/oauth-service/oauth/preauthorized?ticket=ST-1")
                .unwrap();
        let a = signer().authorization_with("GET", &base, "nonce", 42);
        let b = signer().authorization_with("GET", &with_ticket, "nonce", 42);
        assert_ne!(a, b);
    }

    #[test]
    fn percent_encoding_is_rfc3986_strict() {
        assert_eq!(encode("a b+c"), "a%20b%2Bc");
        assert_eq!(encode("~-._"), "~-._");
        assert_eq!(encode("https://sso.garmin.com/sso/embed"), "https%3A%2F%2Fsso.garmin.com%2Fsso%2Fembed");
    }
}
