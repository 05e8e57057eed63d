use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::{RunId, ScenarioId},
    error::ApiErrorBody,
    protocol::{
        BulkDeleteResponse, CreateScenarioRequest, HealthResponse, RunRecord, ScenarioRecord,
        StarRequest,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::error::RequestFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request/response contract to the backend: one attempt, JSON in, JSON out.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<Value, RequestFailure>;
}

pub struct HttpRemoteService {
    http: Client,
    server_url: String,
}

impl HttpRemoteService {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, RequestFailure> {
        let parsed = Url::parse(server_url.trim()).map_err(|err| RequestFailure::Transport {
            method: Method::Get,
            endpoint: server_url.to_string(),
            message: format!("invalid server url: {err}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RequestFailure::Transport {
                method: Method::Get,
                endpoint: server_url.to_string(),
                message: "server_url must start with http:// or https://".to_string(),
            });
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RequestFailure::Transport {
                method: Method::Get,
                endpoint: server_url.to_string(),
                message: format!("failed to build http client: {err}"),
            })?;
        Ok(Self {
            http,
            server_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn call(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<Value, RequestFailure> {
        let transport = |err: reqwest::Error| RequestFailure::Transport {
            method,
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        };

        debug!(%method, endpoint, "remote: dispatching request");
        let mut request = self
            .http
            .request(method.as_reqwest(), format!("{}{endpoint}", self.server_url))
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = payload.as_ref() {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            warn!(%method, endpoint, error = %err, "remote: transport failure");
            transport(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail_text());
            warn!(%method, endpoint, status = status.as_u16(), "remote: request rejected");
            return Err(RequestFailure::Status {
                method,
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                detail,
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| RequestFailure::Decode {
            method,
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct SimulationApi {
    remote: Arc<dyn RemoteService>,
}

impl SimulationApi {
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self { remote }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<T, RequestFailure> {
        let value = self.remote.call(method, endpoint, payload).await?;
        serde_json::from_value(value).map_err(|err| RequestFailure::Decode {
            method,
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        })
    }

    fn body<B: Serialize>(
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<Value, RequestFailure> {
        serde_json::to_value(body).map_err(|err| RequestFailure::Decode {
            method,
            endpoint: endpoint.to_string(),
            message: format!("failed to encode request body: {err}"),
        })
    }

    pub async fn create_scenario(
        &self,
        scenario: &CreateScenarioRequest,
    ) -> Result<ScenarioRecord, RequestFailure> {
        let payload = Self::body(Method::Post, "/scenarios", scenario)?;
        self.request(Method::Post, "/scenarios", Some(payload)).await
    }

    pub async fn list_scenarios(&self) -> Result<Vec<ScenarioRecord>, RequestFailure> {
        self.request(Method::Get, "/scenarios", None).await
    }

    pub async fn start_run(&self, scenario_id: ScenarioId) -> Result<RunRecord, RequestFailure> {
        self.request(Method::Post, &format!("/run?scenario_id={scenario_id}"), None)
            .await
    }

    pub async fn list_runs(&self) -> Result<Vec<RunRecord>, RequestFailure> {
        self.request(Method::Get, "/runs", None).await
    }

    pub async fn fetch_run(&self, run_id: RunId) -> Result<RunRecord, RequestFailure> {
        self.request(Method::Get, &format!("/runs/{run_id}"), None)
            .await
    }

    pub async fn set_run_starred(
        &self,
        run_id: RunId,
        starred: bool,
    ) -> Result<Value, RequestFailure> {
        let endpoint = format!("/runs/{run_id}/star");
        let payload = Self::body(Method::Patch, &endpoint, &StarRequest { starred })?;
        self.remote
            .call(Method::Patch, &endpoint, Some(payload))
            .await
    }

    pub async fn delete_run(&self, run_id: RunId) -> Result<Value, RequestFailure> {
        self.remote
            .call(Method::Delete, &format!("/runs/{run_id}"), None)
            .await
    }

    pub async fn delete_unstarred_runs(&self) -> Result<BulkDeleteResponse, RequestFailure> {
        self.request(Method::Delete, "/runs", None).await
    }

    pub async fn health(&self) -> Result<HealthResponse, RequestFailure> {
        self.request(Method::Get, "/health", None).await
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
