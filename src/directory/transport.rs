// src/directory/transport.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// One HTTP GET returning a decoded JSON body. Non-2xx statuses are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("university_matching/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Directory request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Directory API returned status: {}", status);
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse directory response")
    }
}
