//! API client for the FinOps hub

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Non-success answer from the hub
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request rejected ({status}): {message}")]
    BadRequest { status: u16, message: String },

    #[error("hub error ({status}): {message}")]
    Server { status: u16, message: String },
}

/// API client for the FinOps hub
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request with query parameters
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            let status = status.as_u16();
            return Err(if (400..500).contains(&status) {
                ClientError::BadRequest { status, message }.into()
            } else {
                ClientError::Server { status, message }.into()
            });
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn report(&self, project_id: &str, zones: &str) -> Result<OptimizationReport> {
        self.get(
            "api/v1/report",
            &[("project_id", project_id), ("zones", zones)],
        )
        .await
    }

    pub async fn resources(
        &self,
        project_id: &str,
        zones: Option<&str>,
    ) -> Result<Vec<ResourceSummary>> {
        let mut query = vec![("project_id", project_id)];
        if let Some(zones) = zones {
            query.push(("zones", zones));
        }
        self.get("api/v1/resources", &query).await
    }

    pub async fn projects(&self) -> Result<Vec<ProjectInfo>> {
        self.get("api/v1/projects", &[]).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub project_id: String,
    pub zones: Vec<String>,
    pub summary: ReportSummary,
    pub recommendations: Vec<Recommendation>,
    pub waste_records: Vec<WasteRecord>,
    #[serde(default)]
    pub diagnostics: Vec<ScanFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_potential_savings: f64,
    pub currency: String,
    pub recommendation_count: usize,
    pub waste_record_count: usize,
    pub savings_by_zone: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_zones: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation_id: String,
    pub description: String,
    pub last_refresh_time: String,
    pub priority: String,
    pub subtype: String,
    #[serde(default)]
    pub operations: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_savings: Option<CostSavings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSavings {
    pub currency: String,
    pub amount_per_month: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasteRecord {
    pub resource_id: String,
    pub resource_type: String,
    pub name: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub waste_reason: String,
    pub estimated_monthly_waste: f64,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFailure {
    pub zone: String,
    pub scope: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub name: String,
    pub asset_type: String,
    pub location: String,
    pub project: String,
    pub state: String,
    pub create_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_id: String,
    pub display_name: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const REPORT: &str = r#"{
        "project_id": "proj",
        "zones": ["us-central1-a"],
        "summary": {
            "total_potential_savings": 36.96,
            "currency": "USD",
            "recommendation_count": 1,
            "waste_record_count": 1,
            "savings_by_zone": {"us-central1-a": 36.96}
        },
        "recommendations": [{
            "recommendation_id": "rec-1",
            "description": "Resize",
            "last_refresh_time": "2024-05-01T06:00:00Z",
            "priority": "P2",
            "subtype": "CHANGE_MACHINE_TYPE",
            "operations": [],
            "cost_savings": {"currency": "USD", "amount_per_month": 12.5}
        }],
        "waste_records": [{
            "resource_id": "1",
            "resource_type": "compute_instance",
            "name": "idle-vm",
            "project_id": "proj",
            "zone": "us-central1-a",
            "waste_reason": "Idle VM (< 5% CPU)",
            "estimated_monthly_waste": 24.46,
            "metadata": {"machine_type": "e2-medium"}
        }],
        "diagnostics": []
    }"#;

    #[tokio::test]
    async fn test_report_sends_scope_as_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/report")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("project_id".into(), "proj".into()),
                Matcher::UrlEncoded("zones".into(), "us-central1-a".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(REPORT)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let report = client.report("proj", "us-central1-a").await.unwrap();

        mock.assert_async().await;
        assert_eq!(report.summary.savings_by_zone["us-central1-a"], 36.96);
        assert_eq!(report.waste_records[0].name, "idle-vm");
        assert!(report.summary.failed_zones.is_empty());
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/report")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": "at least one zone is required"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.report("proj", "").await.unwrap_err();

        match err.downcast_ref::<ClientError>() {
            Some(ClientError::BadRequest { status, message }) => {
                assert_eq!(*status, 400);
                assert_eq!(message, "at least one zone is required");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_gateway_is_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/projects")
            .with_status(502)
            .with_body("upstream down")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.projects().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::Server { status: 502, .. })
        ));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
