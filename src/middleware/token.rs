// Bearer injection with just-in-time refresh
//
// The credential lives behind a mutex and the check-refresh-replace sequence
// runs under it, so N concurrent requests that all observe an expired token
// produce a single refresh whose result every waiter sees. The dispatch
// itself runs after the lock is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response, Url};
use tokio::sync::Mutex;

use crate::auth::exchange::{self, OAuthConsumer};
use crate::auth::{AccessToken, OAuth1Token};
use crate::cache::TokenCacher;
use crate::clock::Clock;
use crate::error::Error;
use crate::middleware::Dispatch;

/// Produces a replacement bearer token once the current one expires.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self) -> Result<AccessToken, Error>;
}

pub struct TokenInterceptor {
    token: Mutex<AccessToken>,
    refresher: Arc<dyn Refresher>,
    clock: Arc<dyn Clock>,
    inner: Arc<dyn Dispatch>,
}

impl TokenInterceptor {
    pub fn new(
        token: AccessToken,
        refresher: Arc<dyn Refresher>,
        clock: Arc<dyn Clock>,
        inner: Arc<dyn Dispatch>,
    ) -> Self {
        Self {
            token: Mutex::new(token),
            refresher,
            clock,
            inner,
        }
    }

    /// Current Authorization value, refreshing the held credential first if
    /// its access expiry has passed. Waiters blocked on the lock re-check
    /// expiry after acquisition and so reuse the replacement instead of
    /// refreshing again.
    async fn authorization(&self) -> Result<HeaderValue, Error> {
        let mut token = self.token.lock().await;
        let now = self.clock.now();
        if token.is_expired(now) {
            if token.is_refresh_expired(now) {
                return Err(Error::RefreshExpired);
            }
            tracing::debug!("access token expired, refreshing");
            *token = self.refresher.refresh().await?;
        }
        HeaderValue::from_str(&token.authorization())
            .map_err(|e| Error::Config(format!("authorization header: {e}")))
    }
}

#[async_trait]
impl Dispatch for TokenInterceptor {
    async fn dispatch(&self, mut req: Request) -> Result<Response, Error> {
        let auth = self.authorization().await?;
        req.headers_mut().insert(AUTHORIZATION, auth);
        self.inner.dispatch(req).await
    }
}

/// Refresher that re-runs the bearer exchange signed with the stored
/// delegated token. The provider's refresh-token grant is not functional, so
/// this re-exchange is the refresh path.
pub struct RefreshExchange {
    http: reqwest::Client,
    consumer: Arc<tokio::sync::OnceCell<OAuthConsumer>>,
    consumer_url: Url,
    oauth1: OAuth1Token,
    exchange_url: Url,
    clock: Arc<dyn Clock>,
    cacher: Option<Arc<dyn TokenCacher>>,
}

impl RefreshExchange {
    pub(crate) fn new(
        http: reqwest::Client,
        consumer: Arc<tokio::sync::OnceCell<OAuthConsumer>>,
        consumer_url: Url,
        oauth1: OAuth1Token,
        exchange_url: Url,
        clock: Arc<dyn Clock>,
        cacher: Option<Arc<dyn TokenCacher>>,
    ) -> Self {
        Self {
            http,
            consumer,
            consumer_url,
            oauth1,
            exchange_url,
            clock,
            cacher,
        }
    }
}

#[async_trait]
impl Refresher for RefreshExchange {
    async fn refresh(&self) -> Result<AccessToken, Error> {
        let consumer = self
            .consumer
            .get_or_try_init(|| exchange::fetch_consumer(&self.http, self.consumer_url.clone()))
            .await?;
        let access = exchange::exchange(
            &self.http,
            consumer,
            &self.oauth1,
            self.exchange_url.clone(),
            self.clock.as_ref(),
        )
        .await?;
        if let Some(cacher) = &self.cacher {
            let saved = cacher
                .save_oauth1_token(&self.oauth1)
                .and_then(|()| cacher.save_access_token(&access));
            if let Err(e) = saved {
                tracing::warn!(error = %e, "could not persist refreshed tokens");
            }
        }
        Ok(access)
    }
}
