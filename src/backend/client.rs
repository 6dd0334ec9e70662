use log::{debug, error, warn};
use reqwest::Client;
use std::time::Duration;

use crate::endpoint::Endpoints;
use crate::errors::BackendError;

use super::models::{ModelVariant, SwitchModelRequest, SystemStatus, TranslateRequest, TranslateResponse};

/// HTTP client for the backend's request/response API
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// Resolved endpoints of the backend
    endpoints: Endpoints,
    /// HTTP client for making requests
    client: Client,
}

impl BackendClient {
    /// Create a client for the given endpoints with a request timeout
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Self {
        Self {
            endpoints,
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetch backend readiness info, reporting every failure
    pub async fn fetch_status(&self) -> Result<SystemStatus, BackendError> {
        let url = self.endpoints.status_url();
        debug!("Fetching backend status from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<SystemStatus>(&body)
            .map_err(|e| BackendError::ParseError(format!("status response: {}", e)))
    }

    /// Fetch backend readiness info; any failure means "no status available"
    pub async fn probe_status(&self) -> Option<SystemStatus> {
        match self.fetch_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Status check failed: {}", e);
                None
            }
        }
    }

    /// Translate in a single round trip (non-streaming fallback)
    pub async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse, BackendError> {
        let url = self.endpoints.translate_url();

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Translate API error ({}): {}", status, error_text);
            return Err(BackendError::TranslationFailed {
                status_code: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<TranslateResponse>(&body)
            .map_err(|e| BackendError::ParseError(format!("translate response: {}", e)))
    }

    /// Ask the backend to load another model
    ///
    /// The response body is not inspected; an unsuccessful status is only logged.
    pub async fn switch_model(&self, model: ModelVariant) -> Result<(), BackendError> {
        let url = self.endpoints.switch_model_url();
        let response = self.client.post(&url)
            .json(&SwitchModelRequest { model })
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Model switch to {} answered with {}", model, response.status());
        }
        Ok(())
    }

    /// Hit the backend root and return its greeting message
    pub async fn ping(&self) -> Result<String, BackendError> {
        let url = self.endpoints.root_url();
        let response: serde_json::Value = self.client.get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response["message"].as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::ParseError("missing 'message' in root response".to_string()))
    }
}
