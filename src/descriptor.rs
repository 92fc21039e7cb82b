use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

/// Captures one outgoing request so a 401 can replay it after a refresh.
///
/// The descriptor is owned by the call that issues it; the `retried` flag
/// flips at most once and marks the request ineligible for a second
/// refresh-and-retry cycle.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
    retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends percent-encoded query pairs to the path.
    pub fn query(mut self, pairs: &[(&str, &str)]) -> Self {
        for (key, value) in pairs {
            let sep = if self.path.contains('?') { '&' } else { '?' };
            self.path = format!(
                "{}{}{}={}",
                self.path,
                sep,
                urlencoding::encode(key),
                urlencoding::encode(value)
            );
        }
        self
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attaches an identity-provider bearer token. The header policy strips
    /// it again unless the route is a token exchange.
    pub fn bearer(mut self, token: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            self.headers.insert(AUTHORIZATION, value);
        }
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }
}
