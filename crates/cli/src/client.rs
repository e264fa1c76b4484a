//! API client for communicating with the prediction service

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// A non-success answer from the service
#[derive(Debug, Error)]
#[error("API error ({status}): {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // Statistical options retrain per request, so allow slow answers
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// GET whose body is meaningful for any status (health checks)
    pub async fn get_any_status<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.json().await.context("Failed to parse response")?;
        Ok((status, body))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ApiError { status, message }.into());
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn predict(&self, request: &PredictRequest) -> Result<Prediction> {
        self.post("predict", request).await
    }

    pub async fn options(&self) -> Result<Vec<OptionInfo>> {
        self.get("options").await
    }

    pub async fn health(&self) -> Result<(StatusCode, HealthReport)> {
        self.get_any_status("healthz").await
    }
}

// API request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub option: serde_json::Value,
    pub pred_input: Vec<f64>,
}

/// Flat envelope: backend-specific metric keys plus one label key
pub type Prediction = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionInfo {
    pub id: u64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub components: BTreeMap<String, ComponentReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_predict_posts_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::PartialJson(json!({ "option": 1 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"Heuristic Algorithm Accuracy": 0.61,
                    "Predict 'Cover_type' value for sample - Heuristic Algorithm": 2}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let prediction = client
            .predict(&PredictRequest {
                option: json!(1),
                pred_input: vec![0.0; 54],
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(prediction.len(), 2);
        assert_eq!(
            prediction["Predict 'Cover_type' value for sample - Heuristic Algorithm"],
            2
        );
    }

    #[tokio::test]
    async fn test_error_body_becomes_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Invalid option choice."}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .predict(&PredictRequest {
                option: json!(9),
                pred_input: vec![0.0; 54],
            })
            .await
            .unwrap_err();

        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.message, "Invalid option choice.");
    }

    #[tokio::test]
    async fn test_health_reads_unavailable_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status": "unhealthy", "components": {
                    "dispatcher": {"status": "unhealthy", "message": "down", "last_check_timestamp": 0}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let (status, report) = client.health().await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, "unhealthy");
        assert_eq!(
            report.components["dispatcher"].message.as_deref(),
            Some("down")
        );
    }
}
