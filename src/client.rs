// Session facade
//
// Owns the reqwest client (cookie jar enabled - the SSO handshake is
// cookie-stateful), the interceptor chain, and the login and request entry
// points the resource services build on.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, REFERER};
use reqwest::{Method, Request, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::{OnceCell, RwLock};

use crate::auth::exchange::{self, OAuthConsumer};
use crate::auth::login;
use crate::cache::TokenCacher;
use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::middleware::{
    DebugInterceptor, Dispatch, HttpDispatcher, RefreshExchange, TokenInterceptor,
    UserAgentInterceptor,
};

pub const BASE_DOMAIN: &str = "garmin.com";
pub const USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Header the connectapi host expects on data reads.
const NK_HEADER: HeaderName = HeaderName::from_static("nk");

/// Callback that produces a one-time MFA code when the provider asks for one.
pub type MfaHandler =
    Box<dyn Fn() -> Result<String, Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Resolved endpoint set. Defaults derive from the configured domain; every
/// base can be overridden to point the client at a proxy or a test server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Base of the SSO host, `https://sso.{domain}` by default.
    pub sso: Url,
    /// Base of the API host, `https://connectapi.{domain}` by default.
    pub api: Url,
    /// Location of the consumer-key configuration document.
    pub consumer: Url,
}

impl Endpoints {
    pub fn for_domain(domain: &str) -> Result<Self, Error> {
        Ok(Self {
            sso: parse_base(&format!("https://sso.{domain}"))?,
            api: parse_base(&format!("https://connectapi.{domain}"))?,
            consumer: parse_base(exchange::CONSUMER_URL)?,
        })
    }

    fn at(base: &Url, path: &str, query: &[(impl AsRef<str>, impl AsRef<str>)]) -> Url {
        let mut url = base.clone();
        url.set_path(path);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k.as_ref(), v.as_ref());
            }
        }
        url
    }

    pub(crate) fn sso_embed_url(&self) -> String {
        Self::at(&self.sso, "/sso/embed", &[] as &[(&str, &str)]).to_string()
    }

    pub(crate) fn signin_url(&self, params: &[(&str, String)]) -> Url {
        Self::at(&self.sso, "/sso/signin", params)
    }

    pub(crate) fn verify_mfa_url(&self, params: &[(&str, String)]) -> Url {
        Self::at(&self.sso, "/sso/verifyMFA/loginEnterMfaCode", params)
    }

    pub(crate) fn preauthorized_url(&self, ticket: &str) -> Url {
        let embed = self.sso_embed_url();
        Self::at(
            &self.api,
            "/oauth-service/oauth/preauthorized",
            &[
                ("ticket", ticket),
                ("login-url", embed.as_str()),
                ("accepts-mfa-tokens", "true"),
            ],
        )
    }

    pub(crate) fn exchange_url(&self) -> Url {
        Self::at(
            &self.api,
            "/oauth-service/oauth/exchange/user/2.0",
            &[] as &[(&str, &str)],
        )
    }

    pub(crate) fn api_url(&self, path: &str, query: &[(&str, &str)]) -> Url {
        Self::at(&self.api, path, query)
    }
}

fn parse_base(s: &str) -> Result<Url, Error> {
    Url::parse(s).map_err(|e| Error::Config(format!("invalid endpoint {s:?}: {e}")))
}

pub struct ClientBuilder {
    domain: String,
    user_agent: String,
    endpoints: Option<Endpoints>,
    cacher: Option<Arc<dyn TokenCacher>>,
    mfa_handler: Option<MfaHandler>,
    clock: Arc<dyn Clock>,
    debug: bool,
    debug_skip_body: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            domain: BASE_DOMAIN.to_string(),
            user_agent: USER_AGENT.to_string(),
            endpoints: None,
            cacher: None,
            mfa_handler: None,
            clock: Arc::new(SystemClock),
            debug: false,
            debug_skip_body: false,
        }
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Overrides the resolved endpoint set entirely.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn cacher(mut self, cacher: Arc<dyn TokenCacher>) -> Self {
        self.cacher = Some(cacher);
        self
    }

    pub fn mfa_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn() -> Result<String, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        self.mfa_handler = Some(Box::new(handler));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Enables request/response diagnostic logging. `skip_body` turns off
    /// body capture.
    pub fn debug(mut self, skip_body: bool) -> Self {
        self.debug = true;
        self.debug_skip_body = skip_body;
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        let endpoints = match self.endpoints {
            Some(endpoints) => endpoints,
            None => Endpoints::for_domain(&self.domain)?,
        };
        let agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| Error::Config(format!("invalid user agent: {e}")))?;

        // The user agent is also set at client level so that the exchange
        // requests, which bypass the chain, carry it too.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(agent.clone())
            .build()?;

        let mut chain: Arc<dyn Dispatch> = Arc::new(HttpDispatcher::new(http.clone()));
        if self.debug {
            chain = Arc::new(DebugInterceptor::new(self.debug_skip_body, chain));
        }
        chain = Arc::new(UserAgentInterceptor::new(agent, chain));

        Ok(Client {
            endpoints,
            http,
            transport: RwLock::new(Arc::clone(&chain)),
            base: chain,
            cacher: self.cacher,
            mfa_handler: self.mfa_handler,
            clock: self.clock,
            consumer: Arc::new(OnceCell::new()),
            prev_url: RwLock::new(None),
        })
    }
}

pub struct Client {
    endpoints: Endpoints,
    http: reqwest::Client,
    /// Pre-login chain (identity, optional debug, transport). The SSO
    /// handshake always dispatches through this, never through a bearer
    /// interceptor from an earlier login.
    base: Arc<dyn Dispatch>,
    transport: RwLock<Arc<dyn Dispatch>>,
    cacher: Option<Arc<dyn TokenCacher>>,
    mfa_handler: Option<MfaHandler>,
    clock: Arc<dyn Clock>,
    consumer: Arc<OnceCell<OAuthConsumer>>,
    /// URL of the last response, used as the Referer on the next SSO step.
    prev_url: RwLock<Option<Url>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    pub fn new() -> Result<Self, Error> {
        ClientBuilder::new().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Runs the SSO login flow (or reuses a cached, still-valid token pair)
    /// and installs the bearer interceptor ahead of the transport stack.
    /// Calling it again replaces the session from an earlier login, which is
    /// the recovery path once a refresh token expires.
    ///
    /// A [`Error::CachePersist`] result means the tokens could not be
    /// written to the cache but the session itself is installed and usable.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), Error> {
        let (oauth1, access) = login::login(self, email, password).await?;

        let refresher = Arc::new(RefreshExchange::new(
            self.http.clone(),
            Arc::clone(&self.consumer),
            self.endpoints.consumer.clone(),
            oauth1.clone(),
            self.endpoints.exchange_url(),
            Arc::clone(&self.clock),
            self.cacher.clone(),
        ));
        // The interceptor always goes over the base chain, replacing the one
        // a previous login installed; stacking would leave a stale credential
        // in the path that fails every dispatch once its refresh expires.
        *self.transport.write().await = Arc::new(TokenInterceptor::new(
            access.clone(),
            refresher,
            Arc::clone(&self.clock),
            Arc::clone(&self.base),
        ));
        tracing::info!("login complete");

        if let Some(cacher) = &self.cacher {
            let saved = cacher
                .save_oauth1_token(&oauth1)
                .and_then(|()| cacher.save_access_token(&access));
            if let Err(e) = saved {
                tracing::warn!(error = %e, "tokens were not persisted to the cache");
                return Err(Error::CachePersist(Box::new(e)));
            }
        }
        Ok(())
    }

    /// GET an API path and decode the JSON response. Any non-200 status
    /// becomes [`Error::BadStatus`] carrying the raw body.
    pub async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let mut req = Request::new(Method::GET, self.endpoints.api_url(path, query));
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        req.headers_mut().insert(NK_HEADER, HeaderValue::from_static("NT"));

        let res = self.send(req).await?;
        let status = res.status();
        let body = res.bytes().await?;
        if status != StatusCode::OK {
            return Err(Error::BadStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        tracing::trace!(path = %path, body = %String::from_utf8_lossy(&body), "api response");
        Ok(serde_json::from_slice(&body)?)
    }

    /// Issue an API request with an optional JSON payload. Returns the
    /// status alongside the decoded body; non-2xx statuses become
    /// [`Error::BadStatus`].
    pub async fn api_call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        payload: Option<&serde_json::Value>,
    ) -> Result<(StatusCode, T), Error> {
        let mut req = Request::new(method, self.endpoints.api_url(path, query));
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if let Some(payload) = payload {
            req.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            *req.body_mut() = Some(serde_json::to_vec(payload)?.into());
        }

        let res = self.send(req).await?;
        let status = res.status();
        let body = res.bytes().await?;
        if !status.is_success() {
            return Err(Error::BadStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        tracing::trace!(path = %path, body = %String::from_utf8_lossy(&body), "api response");
        Ok((status, serde_json::from_slice(&body)?))
    }

    /// SSO handshake request: chains the Referer from the previous response
    /// and returns the body regardless of status, since the page title
    /// carries the outcome. Dispatches through the pre-login chain so an
    /// expired session never blocks a fresh login.
    pub(crate) async fn sso_request(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Bytes, Error> {
        let mut req = Request::new(method, url);
        if let Some(prev) = self.prev_url.read().await.as_ref() {
            if let Ok(value) = HeaderValue::from_str(prev.as_str()) {
                req.headers_mut().insert(REFERER, value);
            }
        }
        if let Some(form) = form {
            req.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(form)
                .finish();
            *req.body_mut() = Some(encoded.into());
        }
        let res = self.send_via(self.base.as_ref(), req).await?;
        Ok(res.bytes().await?)
    }

    pub(crate) async fn send(&self, req: Request) -> Result<Response, Error> {
        let transport = Arc::clone(&*self.transport.read().await);
        self.send_via(transport.as_ref(), req).await
    }

    async fn send_via(&self, transport: &dyn Dispatch, req: Request) -> Result<Response, Error> {
        let res = transport.dispatch(req).await?;
        *self.prev_url.write().await = Some(res.url().clone());
        Ok(res)
    }

    /// Consumer key pair, fetched from the well-known document on first use
    /// and held for the lifetime of this client.
    pub(crate) async fn consumer(&self) -> Result<&OAuthConsumer, Error> {
        self.consumer
            .get_or_try_init(|| exchange::fetch_consumer(&self.http, self.endpoints.consumer.clone()))
            .await
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn cacher(&self) -> Option<&Arc<dyn TokenCacher>> {
        self.cacher.as_ref()
    }

    pub(crate) fn mfa_handler(&self) -> Option<&MfaHandler> {
        self.mfa_handler.as_ref()
    }
}
