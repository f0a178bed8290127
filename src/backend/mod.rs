//! HTTP client for the proctoring server.

use crate::error::RequestError;
use crate::model::{ClientConfig, Endpoint, ExamStatus, StatusReply};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ExamClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExamClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    pub async fn start_exam(&self) -> Result<StatusReply, RequestError> {
        self.get_json(Endpoint::StartExam).await
    }

    pub async fn end_exam(&self) -> Result<StatusReply, RequestError> {
        self.get_json(Endpoint::EndExam).await
    }

    pub async fn check_status(&self) -> Result<ExamStatus, RequestError> {
        self.get_json(Endpoint::CheckStatus).await
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, RequestError> {
        let url = self.url(endpoint);
        debug!(%url, "GET");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RequestError::from_reqwest(endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RequestError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        // Read the body first so decode failures are told apart from transport failures.
        let body = resp
            .bytes()
            .await
            .map_err(|e| RequestError::from_reqwest(endpoint, e))?;
        serde_json::from_slice(&body).map_err(|source| RequestError::Decode { endpoint, source })
    }
}
