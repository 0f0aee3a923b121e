use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tokio::sync::Mutex;

use super::credentials::Credentials;
use super::dto::{ProvisionedServer, TokenResponse};
use super::error::{ProviderError, ProviderResult};
use super::{ApiResponse, BmcApi, Connector, STATUS_OK};

pub const DEFAULT_API_BASE: &str = "https://api.phoenixnap.com/bmc/v0";
pub const DEFAULT_TOKEN_URL: &str =
    "https://auth.phoenixnap.com/auth/realms/BMC/protocol/openid-connect/token";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);
/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// When a token issued at `now` should be replaced. `None` never expires,
/// which only happens when the lifetime overflows `Instant`.
fn token_deadline(now: Instant, expires_in: Option<u64>) -> Option<Instant> {
    let lifetime = expires_in
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME);
    now.checked_add(lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN))
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// BMC API client authenticating with the OAuth2 client-credentials grant.
#[derive(Debug)]
pub struct HttpBmcClient {
    client: Client,
    credentials: Credentials,
    base_url: String,
    token_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl HttpBmcClient {
    #[allow(dead_code)]
    pub fn new(credentials: Credentials) -> ProviderResult<Self> {
        Self::with_endpoints(
            credentials,
            DEFAULT_API_BASE,
            DEFAULT_TOKEN_URL,
            DEFAULT_HTTP_TIMEOUT,
        )
    }

    pub fn with_endpoints(
        credentials: Credentials,
        base_url: &str,
        token_url: &str,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        if credentials.client_id.is_empty() || credentials.client_secret.is_empty() {
            return Err(ProviderError::auth(
                "client identifier and secret are required. Set PNAP_CLIENT_ID/PNAP_CLIENT_SECRET or ~/.pnap/config.yaml",
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> ProviderResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        tracing::debug!("Requesting PNAP access token for client {}", self.credentials.client_id);

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ProviderError::auth_with("token request failed", e))?;

        let status = response.status().as_u16();
        if status != STATUS_OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::auth(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::auth_with("invalid token response", e))?;

        let expires_at = token_deadline(Instant::now(), token.expires_in);
        let value = token.access_token;
        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at,
        });

        Ok(value)
    }

    async fn send(&self, request: RequestBuilder) -> ProviderResult<ApiResponse> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse::new(status, body))
    }

    fn server_url(&self, id: &str) -> String {
        format!("{}/servers/{}", self.base_url, id)
    }

    async fn action(&self, id: &str, action: &str) -> ProviderResult<ApiResponse> {
        let url = format!("{}/actions/{}", self.server_url(id), action);
        self.send(self.client.post(url)).await
    }
}

#[async_trait]
impl BmcApi for HttpBmcClient {
    async fn create_server(&self, request: &ProvisionedServer) -> ProviderResult<ApiResponse> {
        let builder = self
            .client
            .post(format!("{}/servers", self.base_url))
            .json(request);
        self.send(builder).await
    }

    async fn get_server(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.send(self.client.get(self.server_url(id))).await
    }

    async fn shut_down(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.action(id, "shutdown").await
    }

    async fn power_on(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.action(id, "power-on").await
    }

    async fn reboot(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.action(id, "reboot").await
    }

    async fn delete_server(&self, id: &str) -> ProviderResult<ApiResponse> {
        self.send(self.client.delete(self.server_url(id))).await
    }
}

/// Connector producing `HttpBmcClient` handles.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    pub base_url: String,
    pub token_url: String,
    pub timeout: Duration,
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl Connector for HttpConnector {
    fn connect(&self, credentials: &Credentials) -> ProviderResult<Arc<dyn BmcApi>> {
        let client = HttpBmcClient::with_endpoints(
            credentials.clone(),
            &self.base_url,
            &self.token_url,
            self.timeout,
        )?;
        Ok(Arc::new(client))
    }
}
