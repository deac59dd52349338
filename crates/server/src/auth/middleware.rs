use std::sync::{Arc, LazyLock};
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use tower::{Layer, Service};
use tracing::info;

use super::ApiKeyAuthenticator;
use crate::api::CallerHeaders;
use crate::error::ServerError;

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[T|t]oken token="(.*)""#).expect("token regex is valid"));

/// Pull the token out of a `Token token="<token>"` authorization header.
pub fn extract_token(header: &str) -> Option<&str> {
    TOKEN_REGEX
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Tower layer that rejects requests without a valid API token.
#[derive(Clone)]
pub struct AuthLayer {
    authenticator: Arc<ApiKeyAuthenticator>,
}

impl AuthLayer {
    pub fn new(authenticator: Arc<ApiKeyAuthenticator>) -> Self {
        Self { authenticator }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

/// Tower service that authenticates requests.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    authenticator: Arc<ApiKeyAuthenticator>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let authenticator = Arc::clone(&self.authenticator);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .and_then(extract_token)
                .is_some_and(|token| authenticator.validate(token));

            if authorized {
                return inner.call(req).await;
            }

            let caller = CallerHeaders::from_headers(req.headers());
            info!(
                url = %req.uri(),
                instance_id = caller.instance_id.as_deref(),
                webhook_id = caller.webhook_id.as_deref(),
                "Unauthorized request."
            );
            Ok(ServerError::Unauthorized.into_response())
        })
    }
}
