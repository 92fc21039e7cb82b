use reqwest::header::{AUTHORIZATION, HeaderMap};
use tracing::debug;

use crate::errors::Error;

/// Static classification of backend routes driving header and refresh
/// decisions.
///
/// Identity-provider bearer tokens belong only on the initial token-exchange
/// routes; everything else rides on the transport's ambient session cookie.
/// The exchange routes plus the refresh route itself are exempt from the
/// 401 refresh-and-retry flow so a rejected credential can never recurse.
#[derive(Clone, Debug)]
pub struct EndpointPolicy {
    bearer_allowed: Vec<String>,
    refresh_exempt: Vec<String>,
}

impl EndpointPolicy {
    pub fn new(bearer_allowed: Vec<String>, refresh_exempt: Vec<String>) -> Result<Self, Error> {
        for route in bearer_allowed.iter().chain(refresh_exempt.iter()) {
            if !route.starts_with('/') {
                return Err(Error::Config(format!(
                    "Policy route '{}' must start with '/'",
                    route
                )));
            }
            if route.contains('?') {
                return Err(Error::Config(format!(
                    "Policy route '{}' must not carry a query string",
                    route
                )));
            }
        }
        Ok(Self {
            bearer_allowed,
            refresh_exempt,
        })
    }

    /// Rules for the default backend layout: bearer tokens only on the
    /// login/signup exchanges, with those two plus the refresh route outside
    /// the retry flow.
    pub fn default_policy() -> Self {
        Self {
            bearer_allowed: vec!["/auth/login".to_string(), "/auth/signup".to_string()],
            refresh_exempt: vec![
                "/auth/login".to_string(),
                "/auth/signup".to_string(),
                "/auth/refresh".to_string(),
            ],
        }
    }

    pub fn bearer_allowed(&self, path: &str) -> bool {
        let route = route_of(path);
        self.bearer_allowed.iter().any(|r| r == route)
    }

    pub fn refresh_exempt(&self, path: &str) -> bool {
        let route = route_of(path);
        self.refresh_exempt.iter().any(|r| r == route)
    }

    /// Pure request-interceptor step: strips a stray `Authorization` header
    /// off routes that must rely on ambient credentials alone. Everything
    /// else passes through unchanged.
    pub fn sanitize_headers(&self, path: &str, headers: &HeaderMap) -> HeaderMap {
        let mut sanitized = headers.clone();
        if !self.bearer_allowed(path) && sanitized.remove(AUTHORIZATION).is_some() {
            debug!(path, "stripped bearer header from non-exchange route");
        }
        sanitized
    }
}

fn route_of(path: &str) -> &str {
    let trimmed = path.split('?').next().unwrap_or(path);
    if trimmed.len() > 1 {
        trimmed.trim_end_matches('/')
    } else {
        trimmed
    }
}
