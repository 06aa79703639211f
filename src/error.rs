// Error types
// One variant per failure family so callers can match on the condition

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The sign-in page did not contain a `_csrf` hidden input.
    #[error("could not find csrf token in page")]
    NoCsrf,

    /// The response body did not contain a `<title>` element.
    #[error("could not find page title")]
    NoTitle,

    /// The success page did not contain an embedded redirect ticket.
    #[error("could not find ticket in page")]
    NoTicket,

    /// Login completed with a page title other than `Success`.
    #[error("login was not successful, page title was {0:?}")]
    NotSuccessful(String),

    /// The provider asked for an MFA code but no handler was configured.
    #[error("no MFA handler configured, cannot answer MFA challenge")]
    NoMfaHandler,

    /// The configured MFA handler failed to produce a code.
    #[error("MFA handler failed: {0}")]
    Mfa(String),

    /// No token of the requested kind is present in the cache. Recoverable:
    /// the login flow treats this as "perform a fresh login".
    #[error("token not found in cache")]
    CacheMiss,

    #[error("token cache i/o failed: {0}")]
    CacheIo(#[source] std::io::Error),

    #[error("cached token could not be decoded: {0}")]
    CacheDecode(#[source] serde_json::Error),

    /// Login succeeded and the session is usable, but the tokens could not
    /// be written to the cache. The next process start will log in afresh.
    #[error("login succeeded but tokens could not be persisted: {0}")]
    CachePersist(#[source] Box<Error>),

    /// Both the access token and the refresh token are past their expiry.
    /// No request is sent; only a new login can recover.
    #[error("refresh token has expired, a new login is required")]
    RefreshExpired,

    /// The delegated-token endpoint answered 200 but without the expected
    /// `oauth_token`/`oauth_token_secret` form fields.
    #[error("delegated token response is missing oauth_token fields")]
    InvalidTokenResponse,

    #[error("bad status code: {status}, body: {body}")]
    BadStatus { status: u16, body: String },

    #[error("could not decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
