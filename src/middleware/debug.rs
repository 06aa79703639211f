// Request/response diagnostics
//
// Logs method, URL, headers and (optionally) the request body at debug level
// without altering the exchange. Response bodies are logged at trace level by
// the client helpers that consume them, since a reqwest response cannot be
// read and forwarded intact from here.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Request, Response};

use crate::error::Error;
use crate::middleware::Dispatch;

pub struct DebugInterceptor {
    skip_body: bool,
    inner: Arc<dyn Dispatch>,
}

impl DebugInterceptor {
    /// `skip_body` turns off request-body capture, for large payloads.
    pub fn new(skip_body: bool, inner: Arc<dyn Dispatch>) -> Self {
        Self { skip_body, inner }
    }
}

#[async_trait]
impl Dispatch for DebugInterceptor {
    async fn dispatch(&self, req: Request) -> Result<Response, Error> {
        tracing::debug!(
            method = %req.method(),
            url = %req.url(),
            headers = ?req.headers(),
            "request"
        );
        if !self.skip_body {
            if let Some(bytes) = req.body().and_then(|body| body.as_bytes()) {
                tracing::debug!(body = %String::from_utf8_lossy(bytes), "request body");
            }
        }

        let res = self.inner.dispatch(req).await?;

        tracing::debug!(
            status = %res.status(),
            headers = ?res.headers(),
            "response"
        );
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::testing::RecordingDispatch;
    use reqwest::header::{HeaderValue, ACCEPT};
    use reqwest::{Method, Request, Url};
    use std::sync::atomic::Ordering;

    fn request_with_body() -> Request {
        let mut req = Request::new(
            Method::POST,
            Url::parse("https://sso.garmin.com/sso/signin").unwrap(),
        );
        *req.body_mut() = Some("username=u&password=p".into());
        req
    }

    #[tokio::test]
    async fn request_passes_through_unaltered() {
        let inner = Arc::new(RecordingDispatch::default());
        let interceptor = DebugInterceptor::new(false, inner.clone());

        let mut req = request_with_body();
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        let res = interceptor.dispatch(req).await.unwrap();

        assert_eq!(res.status(), 200);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        let headers = inner.last_headers.lock().unwrap().clone().unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[tokio::test]
    async fn skip_body_still_dispatches_the_request() {
        let inner = Arc::new(RecordingDispatch::default());
        let interceptor = DebugInterceptor::new(true, inner.clone());

        interceptor.dispatch(request_with_body()).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
