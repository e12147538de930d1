use std::borrow::Cow;
use std::time::Duration;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Url;
use crate::pool::Reset;
use super::request::RequestModel;

/// What a transport hands back for one exchange, before it is modeled.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Final URL after any redirects. `None` means the request URL.
    pub url: Option<Url>,
    pub latency: Duration,
}

/// Response as seen by extraction and expressions.
#[derive(Debug, Clone, Default)]
pub struct ResponseModel {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    url: Option<Url>,
    latency: Duration,
}

impl Reset for ResponseModel {
    fn reset(&mut self) {
        self.status = 0;
        self.headers.clear();
        self.body.clear();
        self.url = None;
        self.latency = Duration::ZERO;
    }
}

impl ResponseModel {
    /// Take over the raw response. The body buffer is moved, not copied.
    pub fn fill(&mut self, raw: RawResponse, origin: &RequestModel) {
        self.status = raw.status;
        self.headers = raw.headers;
        self.body = raw.body;
        self.url = raw.url.or_else(|| origin.url().cloned());
        self.latency = raw.latency;
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_HEADERS: [(&str, &str); 0] = [];
    use reqwest::header::HeaderValue;

    fn origin() -> RequestModel {
        let mut req = RequestModel::default();
        req.setup("GET", "http://a.test/ping", "", NO_HEADERS).unwrap();
        req
    }

    #[test]
    fn test_fill_falls_back_to_request_url() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        let raw = RawResponse {
            status: 200,
            headers,
            body: b"pong".to_vec(),
            url: None,
            latency: Duration::from_millis(12),
        };
        let mut resp = ResponseModel::default();
        resp.fill(raw, &origin());
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.body_text(), "pong");
        assert_eq!(resp.content_type(), "text/html");
        assert_eq!(resp.url().unwrap().as_str(), "http://a.test/ping");
        assert_eq!(resp.latency(), Duration::from_millis(12));
    }

    #[test]
    fn test_fill_keeps_redirected_url() {
        let raw = RawResponse {
            status: 200,
            url: Some(Url::parse("http://a.test/final").unwrap()),
            ..Default::default()
        };
        let mut resp = ResponseModel::default();
        resp.fill(raw, &origin());
        assert_eq!(resp.url().unwrap().path(), "/final");
    }

    #[test]
    fn test_reset() {
        let mut resp = ResponseModel::default();
        resp.fill(RawResponse { status: 500, body: b"err".to_vec(), ..Default::default() }, &origin());
        resp.reset();
        assert_eq!(resp.status(), 0);
        assert!(resp.body().is_empty());
        assert!(resp.url().is_none());
        assert_eq!(resp.content_type(), "");
    }
}
