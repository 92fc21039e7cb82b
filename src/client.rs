use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use rand::{SeedableRng, rngs::StdRng};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::backoff::{BackoffPlan, transient_error, transient_status};
use crate::config::Config;
use crate::descriptor::RequestDescriptor;
use crate::errors::{Error, RefreshError};
use crate::policy::EndpointPolicy;
use crate::refresh::{RefreshCoordinator, RefreshRole};
use crate::session::{Credential, CredentialPayload, CredentialStore};
use crate::telemetry::refresh::RefreshTelemetry;

const LOGIN_ROUTE: &str = "/auth/login";
const SIGNUP_ROUTE: &str = "/auth/signup";
const REFRESH_ROUTE: &str = "/auth/refresh";
const LOGOUT_ROUTE: &str = "/auth/logout";

const USER_AGENT: &str = "marketplace-client-rust-sdk/0.1.0";

/// Client for the marketplace backend.
///
/// Owns the HTTP transport (cookie jar enabled, so the session credential
/// rides ambiently), the endpoint header policy, and the single-flight
/// refresh coordinator. Clones share the coordinator and credential store;
/// separately constructed clients are fully independent.
#[derive(Clone)]
pub struct MarketplaceClient {
    http: Client,
    base_url: String,
    user_agent: String,
    policy: EndpointPolicy,
    plan: BackoffPlan,
    refresh: Arc<RefreshCoordinator>,
    store: Arc<CredentialStore>,
    rng: Arc<Mutex<StdRng>>,
}

impl MarketplaceClient {
    /// Create a new MarketplaceClient
    /// # Arguments
    /// * `config` - Explicit configuration (`Config`), typically loaded via
    ///   `Config::load` or `Config::from_values`.
    /// # ENV Vars (when using `Config::load(ConfigLocation::Env)`)
    /// * `MARKETPLACE_URL` - Backend base URL
    /// * `MARKETPLACE_USER_AGENT` - Optional User-Agent override
    /// * `MARKETPLACE_TIMEOUT_SECS` - Optional per-request timeout
    /// * `MARKETPLACE_MAX_ATTEMPTS` - Optional transient-retry budget
    pub fn new(config: Config) -> Result<Self, Error> {
        let base_url = if config.base_url.starts_with("http") {
            config.base_url.clone()
        } else {
            format!("https://{}", config.base_url)
        };
        let base_url = base_url.trim_end_matches('/').to_string();
        // Validate the base URL before performing any network calls
        let _ = reqwest::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let mut builder = Client::builder().cookie_store(true);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;

        let mut plan = BackoffPlan::default_plan();
        if let Some(max_attempts) = config.max_attempts {
            plan = BackoffPlan::new(max_attempts, plan.base_delay, plan.factor, plan.cap)?;
        }

        Ok(Self {
            http,
            base_url,
            user_agent: config.user_agent.unwrap_or_else(|| USER_AGENT.to_string()),
            policy: EndpointPolicy::default_policy(),
            plan,
            refresh: Arc::new(RefreshCoordinator::new()),
            store: Arc::new(CredentialStore::new()),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        })
    }

    pub fn with_policy(mut self, policy: EndpointPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_backoff(mut self, plan: BackoffPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> Arc<CredentialStore> {
        Arc::clone(&self.store)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Exchange an identity-provider token for a session.
    pub async fn login(&self, identity_token: &str) -> Result<Credential, Error> {
        self.exchange(LOGIN_ROUTE, identity_token).await
    }

    /// Register a new account from an identity-provider token.
    pub async fn signup(&self, identity_token: &str) -> Result<Credential, Error> {
        self.exchange(SIGNUP_ROUTE, identity_token).await
    }

    /// Ends the backend session and drops local credential state either way.
    pub async fn logout(&self) -> Result<(), Error> {
        let result = self.execute(RequestDescriptor::post(LOGOUT_ROUTE)).await;
        self.store.clear();
        match result {
            Ok(response) if response.status().is_success() => {
                info!("logout ok");
                Ok(())
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Err(Error::Http(status, body))
            }
            Err(err) => Err(err),
        }
    }

    /// Refresh the session now, joining any refresh already in flight.
    pub async fn refresh_session(&self) -> Result<Credential, Error> {
        self.refresh_credential().await
    }

    /// Issues a request through the full interceptor chain: header policy,
    /// transient backoff, and the one-shot 401 refresh-and-retry cycle.
    /// Non-401 responses come back unchanged, whatever their status.
    pub async fn execute(&self, request: RequestDescriptor) -> Result<Response, Error> {
        let mut request = request;
        loop {
            let response = self.send(&request).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            let path = request.path();
            if request.retried() {
                warn!("request to '{}' got 401 again after a refresh; giving up", path);
                return Err(Error::Auth(format!(
                    "'{}' still rejected with 401 after session refresh",
                    path
                )));
            }
            if self.policy.refresh_exempt(path) {
                warn!("401 from credential endpoint '{}'; refresh not attempted", path);
                return Err(Error::Auth(format!(
                    "credential endpoint '{}' rejected with 401",
                    path
                )));
            }

            warn!("request to '{}' rejected with 401; refreshing session", path);
            request = request.mark_retried();
            self.refresh_credential().await?;
        }
    }

    /// `execute` plus success-checking and JSON decoding.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<T, Error> {
        let response = self.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(status, body));
        }
        Ok(response.json().await?)
    }

    async fn exchange(&self, route: &str, identity_token: &str) -> Result<Credential, Error> {
        let request = RequestDescriptor::post(route).bearer(identity_token);
        let response = self.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("token exchange failed: route='{}' status={} body='{}'", route, status, body);
            return Err(Error::Http(status, body));
        }
        let payload: CredentialPayload = response.json().await?;
        let credential = Credential::from_payload(payload)?;
        info!(
            "token exchange ok: route='{}' expires_at={}",
            route,
            credential.expires_at()
        );
        self.store.set(credential.clone());
        Ok(credential)
    }

    /// One pass of the transient-failure budget around `send_once`.
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        let mut attempt: u8 = 1;
        loop {
            let outcome = self.send_once(request).await;
            let retriable = match &outcome {
                Ok(response) => transient_status(response.status()),
                Err(Error::Reqwest(err)) => transient_error(err),
                Err(_) => false,
            };
            if !retriable || attempt >= self.plan.max_attempts {
                return outcome;
            }
            let delay = {
                let mut rng = self.rng.lock().await;
                self.plan.delay_for_attempt(attempt + 1, &mut *rng)
            };
            warn!(
                path = request.path(),
                attempt,
                max_attempts = self.plan.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "retry.scheduling"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn send_once(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        let url = format!("{}{}", self.base_url, request.path());
        let headers = self
            .policy
            .sanitize_headers(request.path(), request.headers());
        let mut builder = self
            .http
            .request(request.method().clone(), &url)
            .headers(headers)
            .header("User-Agent", self.user_agent.as_str());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        debug!(
            path = request.path(),
            status = %response.status(),
            "response received"
        );
        Ok(response)
    }

    async fn refresh_credential(&self) -> Result<Credential, Error> {
        match self.refresh.join() {
            RefreshRole::Follower(waiter) => {
                debug!("awaiting in-flight session refresh");
                waiter.outcome().await.map_err(Error::Refresh)
            }
            RefreshRole::Leader(guard) => {
                let telemetry = RefreshTelemetry::new("session.refresh");
                telemetry.emit_start(Timestamp::now());
                match self.call_refresh_endpoint().await {
                    Ok(credential) => {
                        self.store.set(credential.clone());
                        let waiters = guard.settle(Ok(credential.clone()));
                        telemetry.emit_settled(waiters, Timestamp::now());
                        Ok(credential)
                    }
                    Err(err) => {
                        // The backend no longer honors this session; a stale
                        // credential would just replay the same failure.
                        self.store.clear();
                        telemetry.emit_failure(&err, Timestamp::now());
                        let refresh_err = RefreshError::from_error(&err);
                        guard.settle(Err(refresh_err.clone()));
                        Err(Error::Refresh(refresh_err))
                    }
                }
            }
        }
    }

    /// Single-shot on purpose: refresh retry policy belongs to callers, and
    /// the route is refresh-exempt so a 401 here can never recurse.
    async fn call_refresh_endpoint(&self) -> Result<Credential, Error> {
        let url = format!("{}{}", self.base_url, REFRESH_ROUTE);
        let response = self
            .http
            .post(&url)
            .header("User-Agent", self.user_agent.as_str())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("session refresh failed: status={} body='{}'", status, body);
            return Err(Error::Http(status, body));
        }
        let payload: CredentialPayload = response.json().await?;
        let credential = Credential::from_payload(payload)?;
        info!("session refreshed: expires_at={}", credential.expires_at());
        Ok(credential)
    }
}
