use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use crate::errors::VerifyError;
use crate::pool::Reset;

/// One outgoing request built from a rule template.
#[derive(Debug, Clone)]
pub struct RequestModel {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for RequestModel {
    fn default() -> Self {
        Self {
            method: Method::GET,
            url: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

impl Reset for RequestModel {
    fn reset(&mut self) {
        self.method = Method::GET;
        self.url = None;
        self.headers.clear();
        self.body.clear();
    }
}

impl RequestModel {
    /// Fill this model from rendered template parts. Any malformed part is a setup error.
    pub fn setup<'a>(
        &mut self,
        method: &str,
        url: &str,
        body: &str,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<(), VerifyError> {
        let method = if method.trim().is_empty() { "GET" } else { method.trim() };
        self.method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|e| VerifyError::RequestTemplate(format!("Invalid method '{}': {}", method, e)))?;

        let parsed = Url::parse(url)
            .map_err(|e| VerifyError::RequestTemplate(format!("Invalid url '{}': {}", url, e)))?;
        self.url = Some(parsed);

        self.headers.clear();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|e| VerifyError::RequestTemplate(format!("Invalid header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| VerifyError::RequestTemplate(format!("Invalid value for header '{}': {}", name, e)))?;
            self.headers.append(header_name, header_value);
        }

        self.body.clear();
        self.body.extend_from_slice(body.as_bytes());
        Ok(())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn path(&self) -> &str {
        self.url.as_ref().map(Url::path).unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
