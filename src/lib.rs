// Garmin Connect client
//
// The Connect API is gated behind a browser-oriented SSO flow rather than a
// documented token endpoint. `Client::login` walks that flow (CSRF dance,
// form login, optional MFA, ticket scraping, OAuth1 exchange) and installs an
// interceptor that keeps every subsequent request authenticated, refreshing
// the bearer token transparently as it expires.

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod middleware;
pub mod scrape;

mod clock;

pub use api::Api;
pub use client::{Client, ClientBuilder, Endpoints, BASE_DOMAIN, USER_AGENT};
pub use clock::{Clock, SystemClock};
pub use error::Error;
