use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_UPDATE_FREQUENCY_MS: u64 = 5_000;
pub const MIN_UPDATE_FREQUENCY_MS: u64 = 250;
pub const PROJECT_CONFIG_DIR: &str = ".rdash";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server_url: String,
    pub update_frequency_ms: u64,
    pub theme: String,
    pub http: HttpConfig,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            update_frequency_ms: DEFAULT_UPDATE_FREQUENCY_MS,
            theme: "dark".to_string(),
            http: HttpConfig::default(),
            log_file: PathBuf::from("./rdash.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub update_frequency_ms: Option<u64>,
    pub theme: Option<String>,
    pub log_file: Option<PathBuf>,
    pub http: Option<PartialHttpConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialHttpConfig {
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

/// Something worth logging that happened while loading config. Config is
/// resolved before the subscriber exists (the log file path is itself
/// configurable), so these are collected and emitted afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNotice {
    Loaded { path: PathBuf },
    Malformed { path: PathBuf, error: String },
    BadEnv {
        key: &'static str,
        value: String,
        error: String,
    },
    Clamped { requested_ms: u64 },
}

impl ConfigNotice {
    pub fn log(&self) {
        match self {
            ConfigNotice::Loaded { path } => info!(path = %path.display(), "loaded config file"),
            ConfigNotice::Malformed { path, error } => {
                warn!(path = %path.display(), error = %error, "parse config failed")
            }
            ConfigNotice::BadEnv { key, value, error } => {
                warn!(key = %key, value = %value, error = %error, "ignoring env override")
            }
            ConfigNotice::Clamped { requested_ms } => warn!(
                requested_ms = *requested_ms,
                min_ms = MIN_UPDATE_FREQUENCY_MS,
                "update frequency too low, clamping"
            ),
        }
    }
}

impl AppConfig {
    pub fn from_cli(cli: &crate::Cli, notices: &mut Vec<ConfigNotice>) -> Result<Self> {
        let project_root = std::env::current_dir().context("resolve current dir")?;
        let project_cfg = load_project_config(&project_root, notices).unwrap_or_default();
        let file_cfg = load_file_config(notices).unwrap_or_default();
        Ok(Self::merge(
            cli,
            |key| std::env::var(key).ok(),
            project_cfg,
            file_cfg,
            notices,
        ))
    }

    /// Priority: CLI flag -> env var -> project config -> global config -> default.
    pub fn merge(
        cli: &crate::Cli,
        env: impl Fn(&str) -> Option<String>,
        project_cfg: FileConfig,
        file_cfg: FileConfig,
        notices: &mut Vec<ConfigNotice>,
    ) -> Self {
        let defaults = Self::default();

        let server_url = cli
            .server_url
            .clone()
            .or_else(|| env("RDASH_SERVER_URL"))
            .or(project_cfg.server_url)
            .or(file_cfg.server_url)
            .unwrap_or(defaults.server_url);

        let requested_ms = cli
            .update_frequency_ms
            .or_else(|| {
                env("RDASH_UPDATE_FREQUENCY_MS").and_then(|v| match v.trim().parse::<u64>() {
                    Ok(ms) => Some(ms),
                    Err(e) => {
                        notices.push(ConfigNotice::BadEnv {
                            key: "RDASH_UPDATE_FREQUENCY_MS",
                            value: v.clone(),
                            error: e.to_string(),
                        });
                        None
                    }
                })
            })
            .or(project_cfg.update_frequency_ms)
            .or(file_cfg.update_frequency_ms)
            .unwrap_or(defaults.update_frequency_ms);
        let update_frequency_ms = if requested_ms < MIN_UPDATE_FREQUENCY_MS {
            notices.push(ConfigNotice::Clamped { requested_ms });
            MIN_UPDATE_FREQUENCY_MS
        } else {
            requested_ms
        };

        let theme = cli
            .theme
            .clone()
            .or(project_cfg.theme)
            .or(file_cfg.theme)
            .unwrap_or(defaults.theme);

        let log_file = cli
            .log_file
            .clone()
            .or_else(|| env("RDASH_LOG_FILE").map(PathBuf::from))
            .or(project_cfg.log_file)
            .or(file_cfg.log_file)
            .unwrap_or(defaults.log_file);

        let http = {
            let project_http = project_cfg.http.unwrap_or_default();
            let file_http = file_cfg.http.unwrap_or_default();
            HttpConfig {
                connect_timeout_ms: project_http
                    .connect_timeout_ms
                    .or(file_http.connect_timeout_ms)
                    .unwrap_or(defaults.http.connect_timeout_ms),
                request_timeout_ms: project_http
                    .request_timeout_ms
                    .or(file_http.request_timeout_ms)
                    .unwrap_or(defaults.http.request_timeout_ms),
            }
        };

        Self {
            server_url,
            update_frequency_ms,
            theme,
            http,
            log_file,
        }
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut v = Vec::new();
    if let Ok(p) = std::env::var("RDASH_CONFIG") {
        v.push(PathBuf::from(p));
    }
    if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
        v.push(Path::new(&xdg_home).join("rdash/config.toml"));
    } else if let Some(home) = dirs::home_dir() {
        v.push(home.join(".config/rdash/config.toml"));
    }
    v
}

fn read_config(path: &Path, notices: &mut Vec<ConfigNotice>) -> Result<Option<FileConfig>> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    match toml::from_str::<FileConfig>(&s) {
        Ok(cfg) => {
            notices.push(ConfigNotice::Loaded {
                path: path.to_path_buf(),
            });
            Ok(Some(cfg))
        }
        Err(e) => {
            notices.push(ConfigNotice::Malformed {
                path: path.to_path_buf(),
                error: e.to_string(),
            });
            Ok(None)
        }
    }
}

pub fn load_file_config(notices: &mut Vec<ConfigNotice>) -> Result<FileConfig> {
    for p in candidate_paths() {
        if p.exists() {
            if let Some(cfg) = read_config(&p, notices)? {
                return Ok(cfg);
            }
        }
    }
    Ok(FileConfig::default())
}

/// Load project-specific configuration from .rdash/config.toml
pub fn load_project_config(
    project_root: &Path,
    notices: &mut Vec<ConfigNotice>,
) -> Result<FileConfig> {
    let path = project_root.join(PROJECT_CONFIG_DIR).join("config.toml");
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    Ok(read_config(&path, notices)?.unwrap_or_default())
}
