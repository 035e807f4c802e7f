//! REST client for the remote desktop service
//!
//! Every call is a JSON `POST` authenticated with the `x-api-key` header:
//! `/start` acquires an instance, `/instance/{id}/...` drives it.

use crate::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Acquires desktops from the service
pub struct HttpLauncher {
    client: Client,
    api_key: String,
    api_base: String,
}

impl HttpLauncher {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key, api_base)
    }

    /// Launcher whose requests, and the environments it hands out, time out
    pub fn with_timeout(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_key, api_base))
    }

    fn with_client(client: Client, api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EnvironmentLauncher for HttpLauncher {
    async fn launch(&self, instance_type: &str) -> Result<Arc<dyn Environment>> {
        if self.api_key.is_empty() {
            return Err(EnvironmentError::NoApiKey);
        }
        let url = format!("{}/start", self.api_base);
        let body = json!({ "instance_type": instance_type });
        let response: Value = post_json(&self.client, &self.api_key, &url, &body).await?;

        let id = response["id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| EnvironmentError::InvalidResponse("missing instance id".to_string()))?
            .to_string();
        info!("◆ DESKTOP {} ACQUIRED ({})", id, instance_type);

        Ok(Arc::new(HttpEnvironment {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            id,
        }))
    }
}

/// Handle to one running desktop
pub struct HttpEnvironment {
    client: Client,
    api_key: String,
    api_base: String,
    id: String,
}

impl HttpEnvironment {
    fn url(&self, path: &str) -> String {
        format!("{}/instance/{}/{}", self.api_base, self.id, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        post_json(&self.client, &self.api_key, &self.url(path), body).await
    }
}

#[async_trait]
impl Environment for HttpEnvironment {
    fn id(&self) -> &str {
        &self.id
    }

    async fn bash(&self, request: BashRequest) -> Result<ActionOutput> {
        self.post("bash", &request).await
    }

    async fn computer(&self, action: ComputerAction) -> Result<ActionOutput> {
        self.post("computer", &action).await
    }

    async fn edit(&self, request: EditRequest) -> Result<ActionOutput> {
        self.post("edit", &request).await
    }

    async fn execute_code(&self, request: CodeRequest) -> Result<CodeOutput> {
        self.post("code/execute", &request).await
    }

    async fn start_browser(&self) -> Result<String> {
        let response: Value = self.post("browser/start", &json!({})).await?;
        response["cdp_url"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| EnvironmentError::InvalidResponse("missing cdp_url".to_string()))
    }

    async fn stop(&self) -> Result<()> {
        let _: Value = self.post("stop", &json!({})).await?;
        info!("◆ DESKTOP {} RELEASED", self.id);
        Ok(())
    }
}

async fn post_json<B, T>(client: &Client, api_key: &str, url: &str, body: &B) -> Result<T>
where
    B: Serialize + ?Sized + Sync,
    T: DeserializeOwned,
{
    trace!("◆ POST {}", url);
    let response = client
        .post(url)
        .header("x-api-key", api_key)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["detail"].as_str().or(v["error"].as_str()).map(String::from))
            .unwrap_or(text);
        return Err(EnvironmentError::Api {
            status: status.as_u16(),
            message,
        });
    }

    debug!("◆ {} -> {} ({} BYTES)", url, status, text.len());
    // Empty acknowledgements deserialize as null
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    Ok(serde_json::from_str(text)?)
}
