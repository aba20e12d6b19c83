//! HTTP client for the Tally ledger and directory service.
//!
//! # Architecture
//!
//! - [`LedgerApi`] - the operations the engine relies on, one method per endpoint
//! - [`LedgerClient`] - `reqwest` implementation with bearer auth
//! - [`LedgerError`] - status and body mapped onto conflict / not-found / server / network
//!
//! # Error Handling
//!
//! Non-success responses are read (capped at 32 KiB) and their `message` or `msg`
//! field is carried in the error verbatim, so callers can show the ledger's own
//! wording. Calls are never retried; a failure is terminal for that call.

pub mod api;
pub mod auth;
pub mod error;

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use tally_types::{
    Expense, Group, GroupId, NewExpense, NonEmptyString, SettlementTransaction, User, UserId,
};

pub use api::LedgerApi;
pub use auth::{ApiToken, Session};
pub use error::LedgerError;

/// Public deployment of the ledger service.
pub const DEFAULT_BASE_URL: &str = "https://backend-0o9s.onrender.com";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Connection settings for [`LedgerClient`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    base_url: Url,
    token: Option<ApiToken>,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
    allow_http: bool,
}

impl LedgerConfig {
    pub fn new(base_url: &str) -> Result<Self, LedgerError> {
        let base_url =
            Url::parse(base_url).map_err(|e| LedgerError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(LedgerError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            token: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: None,
            allow_http: false,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: ApiToken) -> Self {
        self.token = Some(token);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Permit plain `http://` ledgers (local development, test servers).
    #[must_use]
    pub fn allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn client_builder(config: &LedgerConfig) -> reqwest::ClientBuilder {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .https_only(!config.allow_http)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }
    builder
}

/// HTTP implementation of [`LedgerApi`].
#[derive(Debug, Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<ApiToken>,
}

impl LedgerClient {
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let http = client_builder(&config).build()?;
        Ok(Self {
            http,
            base_url: config.base_url,
            token: config.token,
        })
    }

    /// Same connection pool, different credentials.
    #[must_use]
    pub fn with_token(&self, token: ApiToken) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    /// `POST /auth/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, LedgerError> {
        let body = auth::Credentials { email, password };
        let request = self.request(Method::POST, &["auth", "login"])?.json(&body);
        self.send_json(request).await
    }

    /// `POST /auth/register`. The new account still has to log in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), LedgerError> {
        let body = auth::Registration {
            name,
            email,
            password,
        };
        let request = self.request(Method::POST, &["auth", "register"])?.json(&body);
        self.send_unit(request).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, LedgerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| LedgerError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, LedgerError> {
        let url = self.endpoint(segments)?;
        Ok(self.build(method, url))
    }

    fn build(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, LedgerError> {
        let request = request.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.http.execute(request).await.map_err(|e| {
            tracing::warn!(%method, %path, error = %e, "Ledger request failed");
            LedgerError::Network(e)
        })?;

        let status = response.status();
        tracing::debug!(%method, %path, status = status.as_u16(), "Ledger response");

        if status.is_success() {
            return Ok(response);
        }

        let body = read_capped_error_body(response).await;
        let message = error::extract_message(&body);
        tracing::warn!(%method, %path, status = status.as_u16(), message = ?message, "Ledger rejected request");
        Err(LedgerError::from_status(status, message))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, LedgerError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_unit(&self, request: RequestBuilder) -> Result<(), LedgerError> {
        self.execute(request).await.map(drop)
    }

    fn with_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<RequestBuilder, LedgerError> {
        Ok(self.request(method, segments)?.json(body))
    }
}

pub async fn read_capped_error_body(response: Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

#[async_trait::async_trait]
impl LedgerApi for LedgerClient {
    async fn search_users(&self, email_prefix: &str) -> Result<Vec<User>, LedgerError> {
        let mut url = self.endpoint(&["auth", "users"])?;
        url.query_pairs_mut().append_pair("email", email_prefix);
        self.send_json(self.build(Method::GET, url)).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>, LedgerError> {
        self.send_json(self.request(Method::GET, &["groups"])?).await
    }

    async fn create_group(
        &self,
        name: &NonEmptyString,
        members: &[UserId],
    ) -> Result<Group, LedgerError> {
        let body = json!({ "name": name.as_str(), "members": members });
        self.send_json(self.with_json(Method::POST, &["groups"], &body)?)
            .await
    }

    async fn rename_group(&self, group: &GroupId, name: &str) -> Result<Group, LedgerError> {
        let body = json!({ "name": name });
        self.send_json(self.with_json(Method::PATCH, &["groups", group.as_str()], &body)?)
            .await
    }

    async fn add_member(&self, group: &GroupId, user: &UserId) -> Result<Group, LedgerError> {
        let body = json!({ "userId": user });
        let segments = ["groups", group.as_str(), "members"];
        self.send_json(self.with_json(Method::PATCH, &segments, &body)?)
            .await
    }

    async fn delete_group(&self, group: &GroupId) -> Result<(), LedgerError> {
        self.send_unit(self.request(Method::DELETE, &["groups", group.as_str()])?)
            .await
    }

    async fn create_expense(&self, expense: &NewExpense) -> Result<Expense, LedgerError> {
        self.send_json(self.with_json(Method::POST, &["expenses"], expense)?)
            .await
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, LedgerError> {
        self.send_json(self.request(Method::GET, &["expenses"])?).await
    }

    async fn settlements(
        &self,
        group: &GroupId,
    ) -> Result<Vec<SettlementTransaction>, LedgerError> {
        self.send_json(self.request(Method::GET, &["settlements", group.as_str()])?)
            .await
    }

    async fn settle(&self, group: &GroupId, tx: &SettlementTransaction) -> Result<(), LedgerError> {
        let body = json!({
            "groupId": group,
            "fromId": tx.from_id,
            "toId": tx.to_id,
            "amount": tx.amount,
        });
        self.send_unit(self.with_json(Method::POST, &["settlements", "settle"], &body)?)
            .await
    }
}
