use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::repository::{ContentSource, SaveStrategy};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
    Flag,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
            ConfigSource::Flag => write!(f, "flag"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Where the admin tools read and write content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON files in `content_dir`
    Local,
    /// A branch of a GitHub repository
    Remote,
    /// A running content API server at `api_url`
    Api,
    /// An in-process repository seeded with the bundled content
    Memory,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Local => write!(f, "local"),
            SourceKind::Remote => write!(f, "remote"),
            SourceKind::Api => write!(f, "api"),
            SourceKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(SourceKind::Local),
            "remote" | "github" => Ok(SourceKind::Remote),
            "api" => Ok(SourceKind::Api),
            "memory" => Ok(SourceKind::Memory),
            _ => Err(format!(
                "Invalid content source: '{}'. Valid values: local, remote, api, memory",
                s
            )),
        }
    }
}

/// GitHub repository holding the content files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Token with contents:write on the repository
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub api_url: String,
    pub strategy: SaveStrategy,
    pub commit_message: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            token: None,
            api_url: "https://api.github.com".to_string(),
            strategy: SaveStrategy::AtomicTree,
            commit_message: "chore(content): update site, navigation, products from admin"
                .to_string(),
        }
    }
}

impl GitHubConfig {
    /// Returns true if owner, repo and a non-empty token are all present
    pub fn is_configured(&self) -> bool {
        !self.owner.is_empty()
            && !self.repo.is_empty()
            && self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Content API server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Bearer token required for `PUT /api/content` when set
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            admin_token: None,
        }
    }
}

/// Generative-language API used for coffee recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-3-flash-preview".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Which content repository to use
    pub source: ConfigValue<SourceKind>,
    /// Directory holding `content/*.json` for the local source
    pub content_dir: ConfigValue<PathBuf>,
    /// Base URL of the content API for the api source
    pub api_url: ConfigValue<String>,
    /// Timeout applied to every outbound HTTP request
    pub request_timeout_secs: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub github: GitHubConfig,
    pub server: ServerConfig,
    pub recommend: RecommendConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    source: Option<SourceKind>,
    content_dir: Option<PathBuf>,
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    github: Option<GitHubConfig>,
    server: Option<ServerConfig>,
    recommend: Option<RecommendConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut source = ConfigValue::new(SourceKind::Local, ConfigSource::Default);
        let mut content_dir = ConfigValue::new(PathBuf::from("."), ConfigSource::Default);
        let mut api_url = ConfigValue::new(
            "http://localhost:8080".to_string(),
            ConfigSource::Default,
        );
        let mut request_timeout_secs = ConfigValue::new(15, ConfigSource::Default);
        let mut config_file = None;
        let mut github = GitHubConfig::default();
        let mut server = ServerConfig::default();
        let mut recommend = RecommendConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(kind) = file_config.source {
                source = ConfigValue::new(kind, ConfigSource::File);
            }
            if let Some(dir) = file_config.content_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                content_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(url) = file_config.api_url {
                api_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(secs) = file_config.request_timeout_secs {
                request_timeout_secs = ConfigValue::new(secs, ConfigSource::File);
            }
            if let Some(g) = file_config.github {
                github = g;
            }
            if let Some(s) = file_config.server {
                server = s;
            }
            if let Some(r) = file_config.recommend {
                recommend = r;
            }
        }

        // Apply environment variable overrides
        if let Ok(kind) = std::env::var("ROASTERY_SOURCE") {
            let kind = kind.parse().map_err(ConfigError::InvalidValue)?;
            source = ConfigValue::new(kind, ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("ROASTERY_CONTENT_DIR") {
            content_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("ROASTERY_API_URL") {
            api_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(secs) = std::env::var("ROASTERY_REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("Invalid request timeout: '{}'", secs))
            })?;
            request_timeout_secs = ConfigValue::new(secs, ConfigSource::Environment);
        }
        // GITHUB_TOKEN is what the hosting platform injects; the prefixed name wins
        if let Ok(token) =
            std::env::var("ROASTERY_GITHUB_TOKEN").or_else(|_| std::env::var("GITHUB_TOKEN"))
        {
            github.token = Some(token);
        }
        if let Ok(owner) = std::env::var("ROASTERY_GITHUB_OWNER") {
            github.owner = owner;
        }
        if let Ok(repo) = std::env::var("ROASTERY_GITHUB_REPO") {
            github.repo = repo;
        }
        if let Ok(branch) = std::env::var("ROASTERY_GITHUB_BRANCH") {
            github.branch = branch;
        }
        if let Ok(port) = std::env::var("ROASTERY_PORT") {
            server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("Invalid port: '{}'", port)))?;
        }
        if let Ok(token) = std::env::var("ROASTERY_ADMIN_TOKEN") {
            server.admin_token = Some(token);
        }
        if let Ok(key) =
            std::env::var("ROASTERY_RECOMMEND_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY"))
        {
            recommend.api_key = Some(key);
        }

        Ok(Self {
            source,
            content_dir,
            api_url,
            request_timeout_secs,
            config_file,
            github,
            server,
            recommend,
        })
    }

    /// Overrides the content source from a command-line flag.
    pub fn with_source(mut self, kind: SourceKind) -> Self {
        self.source = ConfigValue::new(kind, ConfigSource::Flag);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    /// The content source selected by `source`, with its settings.
    pub fn content_source(&self) -> ContentSource {
        match self.source.value {
            SourceKind::Local => ContentSource::Local(self.content_dir.value.clone()),
            SourceKind::Remote => ContentSource::GitHub {
                config: self.github.clone(),
                timeout: self.request_timeout(),
            },
            SourceKind::Api => ContentSource::Api {
                url: self.api_url.value.clone(),
                token: self.server.admin_token.clone(),
                timeout: self.request_timeout(),
            },
            SourceKind::Memory => ContentSource::Memory,
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/roastery/
    /// - macOS: ~/Library/Application Support/roastery/
    /// - Windows: %APPDATA%/roastery/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("roastery")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {1}", .0.display())]
    ReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, #[source] serde_yaml::Error),

    #[error("{0}")]
    InvalidValue(String),
}
