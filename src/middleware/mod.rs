// Request interceptor chain
//
// Each interceptor wraps the dispatcher below it and exposes the same
// dispatch capability, so the chain composes linearly: outer-to-inner call
// order is install order. The terminal dispatcher hands the request to
// reqwest.

mod debug;
mod token;

pub use debug::DebugInterceptor;
pub use token::{RefreshExchange, Refresher, TokenInterceptor};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Request, Response};

use crate::error::Error;

#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, req: Request) -> Result<Response, Error>;
}

/// Terminal dispatcher, executes the request on the shared reqwest client.
pub(crate) struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub(crate) fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn dispatch(&self, req: Request) -> Result<Response, Error> {
        tracing::trace!(method = %req.method(), url = %req.url(), "dispatching request");
        Ok(self.client.execute(req).await?)
    }
}

/// Sets the default client-identity header, unless the caller already set
/// one on the request.
pub struct UserAgentInterceptor {
    agent: HeaderValue,
    inner: Arc<dyn Dispatch>,
}

impl UserAgentInterceptor {
    pub fn new(agent: HeaderValue, inner: Arc<dyn Dispatch>) -> Self {
        Self { agent, inner }
    }
}

#[async_trait]
impl Dispatch for UserAgentInterceptor {
    async fn dispatch(&self, mut req: Request) -> Result<Response, Error> {
        if !req.headers().contains_key(USER_AGENT) {
            req.headers_mut().insert(USER_AGENT, self.agent.clone());
        }
        self.inner.dispatch(req).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Dispatcher that answers 200 with an empty body and records what it
    /// saw.
    #[derive(Default)]
    pub struct RecordingDispatch {
        pub calls: AtomicUsize,
        pub last_headers: Mutex<Option<reqwest::header::HeaderMap>>,
    }

    #[async_trait]
    impl Dispatch for RecordingDispatch {
        async fn dispatch(&self, req: Request) -> Result<Response, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_headers.lock().unwrap() = Some(req.headers().clone());
            let res = http::Response::builder()
                .status(200)
                .body(Vec::new())
                .expect("static response");
            Ok(res.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingDispatch;
    use super::*;
    use reqwest::{Method, Url};
    use std::sync::atomic::Ordering;

    fn request() -> Request {
        Request::new(
            Method::GET,
            Url::parse("https://connectapi.garmin.com/userprofile-service/x").unwrap(),
        )
    }

    #[tokio::test]
    async fn user_agent_is_stamped_when_absent() {
        let inner = Arc::new(RecordingDispatch::default());
        let interceptor = UserAgentInterceptor::new(
            HeaderValue::from_static("com.garmin.android.apps.connectmobile"),
            inner.clone(),
        );

        interceptor.dispatch(request()).await.unwrap();

        let headers = inner.last_headers.lock().unwrap().clone().unwrap();
        assert_eq!(
            headers.get(USER_AGENT).unwrap(),
            "com.garmin.android.apps.connectmobile"
        );
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn caller_supplied_user_agent_wins() {
        let inner = Arc::new(RecordingDispatch::default());
        let interceptor =
            UserAgentInterceptor::new(HeaderValue::from_static("default-agent"), inner.clone());

        let mut req = request();
        req.headers_mut()
            .insert(USER_AGENT, HeaderValue::from_static("caller-agent"));
        interceptor.dispatch(req).await.unwrap();

        let headers = inner.last_headers.lock().unwrap().clone().unwrap();
        assert_eq!(headers.get(USER_AGENT).unwrap(), "caller-agent");
    }
}
