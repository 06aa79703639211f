// Token exchange against the oauth-service endpoints
//
// Two stages: the SSO ticket buys a delegated OAuth1 token from the
// preauthorized endpoint, which then signs the POST that mints the bearer
// access/refresh pair.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::Deserialize;

use crate::auth::signer::Signer;
use crate::auth::token::{AccessToken, OAuth1Token};
use crate::clock::Clock;
use crate::error::Error;

/// Well-known document carrying the consumer key pair for the oauth-service
/// endpoints. Published out-of-band; fetched once per client.
pub(crate) const CONSUMER_URL: &str = "https://thegarth.s3.amazonaws.com/oauth_consumer.json";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConsumer {
    #[serde(rename = "consumer_key")]
    pub key: String,
    #[serde(rename = "consumer_secret")]
    pub secret: String,
}

pub(crate) async fn fetch_consumer(
    http: &reqwest::Client,
    url: Url,
) -> Result<OAuthConsumer, Error> {
    tracing::debug!(url = %url, "fetching oauth consumer configuration");
    let res = http.get(url).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(Error::BadStatus {
            status: status.as_u16(),
            body: res.text().await.unwrap_or_default(),
        });
    }
    let body = res.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Trades the SSO ticket for a delegated OAuth1 token. `url` already carries
/// the ticket and widget parameters; the request is signed with the consumer
/// credentials alone.
pub(crate) async fn preauthorized_token(
    http: &reqwest::Client,
    consumer: &OAuthConsumer,
    url: Url,
    clock: &dyn Clock,
) -> Result<OAuth1Token, Error> {
    let signer = Signer {
        consumer_key: &consumer.key,
        consumer_secret: &consumer.secret,
        token: None,
        token_secret: None,
    };
    let auth = signer.authorization("GET", &url, clock.now());
    let res = http.get(url).header(AUTHORIZATION, auth).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(Error::BadStatus {
            status: status.as_u16(),
            body: res.text().await.unwrap_or_default(),
        });
    }
    let body = res.text().await?;
    parse_token_response(&body)
}

fn parse_token_response(body: &str) -> Result<OAuth1Token, Error> {
    let mut token = None;
    let mut secret = None;
    for (k, v) in url::form_urlencoded::parse(body.as_bytes()) {
        match k.as_ref() {
            "oauth_token" => token = Some(v.into_owned()),
            "oauth_token_secret" => secret = Some(v.into_owned()),
            _ => {}
        }
    }
    match (token, secret) {
        (Some(token), Some(secret)) => Ok(OAuth1Token {
            token,
            secret,
            mfa_token: None,
        }),
        _ => Err(Error::InvalidTokenResponse),
    }
}

/// Exchanges the delegated token for a bearer pair. This is also the refresh
/// path: the provider's refresh-token grant does not work, so a refresh
/// re-runs this exchange signed with the stored delegated token.
pub(crate) async fn exchange(
    http: &reqwest::Client,
    consumer: &OAuthConsumer,
    token: &OAuth1Token,
    url: Url,
    clock: &dyn Clock,
) -> Result<AccessToken, Error> {
    let signer = Signer {
        consumer_key: &consumer.key,
        consumer_secret: &consumer.secret,
        token: Some(&token.token),
        token_secret: Some(&token.secret),
    };
    let auth = signer.authorization("POST", &url, clock.now());
    let res = http
        .post(url)
        .header(AUTHORIZATION, auth)
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .body("")
        .send()
        .await?;
    let now = clock.now();
    let status = res.status();
    if !status.is_success() {
        return Err(Error::BadStatus {
            status: status.as_u16(),
            body: res.text().await.unwrap_or_default(),
        });
    }
    let body = res.bytes().await?;
    let mut access: AccessToken = serde_json::from_slice(&body)?;
    access.set_expirations(now);
    tracing::debug!(expires = %access.expires_at(), "bearer token minted");
    Ok(access)
}
