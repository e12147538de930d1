use std::time::{Duration, Instant};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use crate::config::HttpConfig;
use crate::errors::{TransportError, TransportErrorKind, VerifyError};
use super::request::RequestModel;
use super::response::RawResponse;
use tracing::debug;

/// Performs one HTTP exchange for a rule step.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        request: &RequestModel,
        follow_redirects: bool,
    ) -> Result<RawResponse, TransportError>;
}

/// Default transport on top of `reqwest`. Holds one client per redirect policy.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    follow: Client,
    direct: Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, VerifyError> {
        Ok(Self {
            follow: build_client(config, Policy::limited(config.max_redirects))?,
            direct: build_client(config, Policy::none())?,
        })
    }
}

fn build_client(config: &HttpConfig, policy: Policy) -> Result<Client, VerifyError> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .redirect(policy);

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy)
            .map_err(|e| VerifyError::Config(format!("Invalid proxy '{}': {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| VerifyError::Config(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn exchange(
        &self,
        request: &RequestModel,
        follow_redirects: bool,
    ) -> Result<RawResponse, TransportError> {
        let url = request
            .url()
            .cloned()
            .ok_or_else(|| TransportError::new(TransportErrorKind::Request, "request has no url"))?;
        let client = if follow_redirects { &self.follow } else { &self.direct };

        debug!(method = %request.method(), url = %url, follow_redirects, "Sending request");
        let started = Instant::now();
        let response = client
            .request(request.method().clone(), url)
            .headers(request.headers().clone())
            .body(request.body().to_vec())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(TransportErrorKind::Body, e.to_string()))?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
            url: Some(final_url),
            latency: started.elapsed(),
        })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if e.is_redirect() {
        TransportErrorKind::Redirect
    } else if e.is_connect() {
        TransportErrorKind::Connect
    } else if e.is_builder() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, e.to_string())
}
