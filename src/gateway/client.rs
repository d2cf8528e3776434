use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use super::error::GatewayError;
use super::types::{ConnectRequest, InitRequest, InitResponse};

/// HTTP client for the Uazapi WhatsApp gateway.
///
/// Carries two credentials: the platform-wide admin token, used only by
/// [`init`](UazapiClient::init), and per-instance tokens passed by the
/// caller to every other operation. The two are never mixed.
pub struct UazapiClient {
    admin_token: String,
    client: Client,
    base_url: String,
}

impl UazapiClient {
    pub fn new(base_url: String, admin_token: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            admin_token,
            client,
            base_url,
        }
    }

    /// Create a new instance on the provider. The only admin-credential call.
    pub async fn init(&self, name: &str) -> Result<InitResponse, GatewayError> {
        let response = self
            .client
            .post(format!("{}/instance/init", self.base_url))
            .header("admintoken", &self.admin_token)
            .json(&InitRequest {
                name: name.to_string(),
            })
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body = response.json::<InitResponse>().await?;
        Ok(body)
    }

    /// Fetch the current connection state of an instance. Returns the raw
    /// provider payload; the caller maps the status vocabulary.
    pub async fn status(&self, instance_token: &str) -> Result<Value, GatewayError> {
        let response = self
            .client
            .get(format!("{}/instance/status", self.base_url))
            .header("token", instance_token)
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body = response.json::<Value>().await?;
        Ok(body)
    }

    /// Start the QR or pairing flow. With `phone`, the provider returns a
    /// pairing code; without it, a QR image. The payload is passed through
    /// untouched so the presentation layer can pick whichever field came.
    pub async fn connect(
        &self,
        instance_token: &str,
        phone: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(format!("{}/instance/connect", self.base_url))
            .header("token", instance_token)
            .json(&ConnectRequest {
                phone: phone.map(str::to_string),
            })
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body = response.json::<Value>().await?;
        Ok(body)
    }

    pub async fn disconnect(&self, instance_token: &str) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(format!("{}/instance/disconnect", self.base_url))
            .header("token", instance_token)
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body = response.json::<Value>().await?;
        Ok(body)
    }

    pub async fn pause(&self, instance_token: &str) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(format!("{}/instance/pause", self.base_url))
            .header("token", instance_token)
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body = response.json::<Value>().await?;
        Ok(body)
    }

    pub async fn delete(&self, instance_token: &str) -> Result<Value, GatewayError> {
        let response = self
            .client
            .delete(format!("{}/instance", self.base_url))
            .header("token", instance_token)
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body = response.json::<Value>().await?;
        Ok(body)
    }

    /// Turn a non-2xx response into an `ApiError` carrying the body text.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GatewayError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}
