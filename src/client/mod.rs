mod command;
mod error;

pub use command::{CommandAction, RepoCommand};
pub use error::{ClientError, ClientResult, ErrorKind};

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::HttpConfig;
use crate::repos::RepositoryIndex;

/// HTTP client for the registry watcher backend.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    pub base_url: String,
    pub(crate) inner: reqwest::Client,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into();
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidConfig(format!("server url {base_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "server url {base_url:?}: unsupported scheme {}",
                parsed.scheme()
            )));
        }
        let inner = reqwest::Client::builder().build()?;
        Ok(Self { base_url, inner })
    }

    pub fn with_http_config(mut self, cfg: &HttpConfig) -> Self {
        let builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms));
        match builder.build() {
            Ok(c) => self.inner = c,
            Err(e) => warn!(error = %e, "keeping default http client"),
        }
        self
    }

    /// Joins `path` onto the base URL. Repository names go in verbatim.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/{}", path.trim_start_matches('/'))
    }

    pub async fn fetch_repos(&self) -> ClientResult<RepositoryIndex> {
        let url = self.endpoint("/repos");
        debug!(target: "client", endpoint = %url, "polling repositories");
        let resp = self.inner.get(&url).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Server { status, body: text });
        }
        let index: RepositoryIndex = serde_json::from_str(&text)?;
        debug!(target: "client", repos = index.len(), "repositories received");
        Ok(index)
    }

    pub async fn deploy(&self, repo: &str, tag: &str) -> ClientResult<()> {
        self.execute(&RepoCommand::deploy(repo, tag)).await
    }

    pub async fn set_auto_deploy(&self, repo: &str, enabled: bool) -> ClientResult<()> {
        self.execute(&RepoCommand::auto_deploy(repo, enabled)).await
    }

    pub async fn reset(&self, repo: &str) -> ClientResult<()> {
        self.execute(&RepoCommand::reset(repo)).await
    }

    pub async fn execute(&self, cmd: &RepoCommand) -> ClientResult<()> {
        let url = self.endpoint(&cmd.path());
        let body = cmd.body();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(target: "client", endpoint = %url, payload = %body, "sending command");
        let resp = self
            .inner
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(repo = %cmd.repo, action = %cmd.action, %status, "command rejected");
            return Err(ClientError::Server { status, body: text });
        }
        info!(repo = %cmd.repo, action = %cmd.action, "command accepted");
        Ok(())
    }
}
