//! reqwest client for the sandbox backend.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::app::check::Validator;
use crate::app::persist::Store;
use crate::domain::errors::{Result, SandboxError};
use crate::domain::model::Dir;
use crate::domain::wire::{BuildRequest, BuildResponse, SavePayload, SourcesPayload};
use crate::infra::config::Config;

const SOURCES_PATH: &str = "/sandbox/sources";
const BUILD_PATH: &str = "/sandbox/sources/build";

/// Talks JSON to `{base}/sandbox/sources` and its build endpoint.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.server.base_url,
            Duration::from_secs(config.server.timeout_secs),
        )
        .with_context(|| format!("failed to create HTTP client for {}", config.server.base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

fn ensure_success(endpoint: &str, response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SandboxError::Status {
            endpoint: endpoint.to_owned(),
            status,
        })
    }
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: reqwest::Response) -> Result<T> {
    ensure_success(endpoint, &response)?;
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| SandboxError::Decode {
        endpoint: endpoint.to_owned(),
        source,
    })
}

impl Store for HttpBackend {
    async fn load(&self) -> Result<Vec<Dir>> {
        let endpoint = self.endpoint(SOURCES_PATH);
        let response = self.client.get(&endpoint).send().await?;
        let payload: SourcesPayload = decode(&endpoint, response).await?;
        tracing::info!(dirs = payload.dirs.len(), "loaded sources");
        Ok(payload.dirs)
    }

    async fn save(&self, payload: &SavePayload) -> Result<()> {
        let endpoint = self.endpoint(SOURCES_PATH);
        let response = self.client.put(&endpoint).json(payload).send().await?;
        ensure_success(&endpoint, &response)?;
        tracing::info!(
            dirs = payload.dirs.len(),
            update_builds = payload.update_builds,
            "saved sources"
        );
        Ok(())
    }
}

impl Validator for HttpBackend {
    async fn build(&self, request: &BuildRequest) -> Result<BuildResponse> {
        let endpoint = self.endpoint(BUILD_PATH);
        let response = self.client.post(&endpoint).json(request).send().await?;
        let body: BuildResponse = decode(&endpoint, response).await?;
        tracing::info!(
            errors = body.errors.as_ref().map_or(0, Vec::len),
            "build check answered"
        );
        Ok(body)
    }
}
