use crate::catalog::{VideoEntry, default_videos};
use crate::claim::KeyMaterial;
use crate::gate::policy::{
    ExemptionPolicy, PathPattern, default_always_exempt, default_anonymous_exempt,
};
use clap::ArgAction::Append;
use clap::Parser;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure that can be loaded from CLI, config file, or environment
///
/// Example configuration file content
/// # Video Gate Configuration
///
/// listen_on_port = 8000
/// token_ttl_secs = 3600
/// request_timeout_secs = 30
/// static_dir = "./static"
/// media_dir = "./media"
///
/// # base64, at least 32 bytes. Prefer the VIDEO_GATE_SIGNING_KEY env var.
/// signing_key = "uBhfVeH0b7KQKfwOJqhwzLXKBpg7xLPBe5HjCksDDWg="
///
/// # Exemption rules: "/exact", "/prefix/*" or "*.suffix"
/// exempt_paths = ["/", "/get-token"]
/// public_paths = ["/static/*"]
///
/// [videos.sample1]
/// kind = "manifest"
/// location = "sample1/master.m3u8"
///
/// [videos.yt1]
/// kind = "external_embed"
/// location = "https://www.youtube.com/embed/dQw4w9WgXcQ"
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[serde(default)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Configuration file path (overrides all other arguments)
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Base64 encoded HMAC key, at least 32 bytes.
    /// A random key is generated when absent; tokens then die with the process.
    /// You can generate a key with: openssl rand -base64 32
    #[arg(
        long,
        env = "VIDEO_GATE_SIGNING_KEY",
        hide_env_values = true,
        value_parser = KeyMaterial::from_base64
    )]
    #[serde(skip_serializing, deserialize_with = "de_signing_key")]
    pub signing_key: Option<KeyMaterial>,

    /// Token lifetime in seconds
    #[arg(long, default_value_t = 3600)]
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Directory served publicly under /static
    #[arg(long, default_value = "static")]
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Directory holding protected manifests, never served directly
    #[arg(long, default_value = "media")]
    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    /// Paths that skip token checks entirely. Can be specified multiple times.
    #[arg(long = "exempt-path", action = Append, default_values_t = default_always_exempt())]
    #[serde(default = "default_always_exempt")]
    pub exempt_paths: Vec<PathPattern>,

    /// Paths reachable without a token; a presented token is still checked.
    /// Can be specified multiple times.
    #[arg(long = "public-path", action = Append, default_values_t = default_anonymous_exempt())]
    #[serde(default = "default_anonymous_exempt")]
    pub public_paths: Vec<PathPattern>,

    /// Video catalog, config file only
    #[arg(skip = default_videos())]
    #[serde(default = "default_videos")]
    pub videos: BTreeMap<String, VideoEntry>,
}

fn de_signing_key<'de, D>(de: D) -> Result<Option<KeyMaterial>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<String>::deserialize(de)?;
    let Some(repr) = repr else {
        return Ok(None);
    };

    KeyMaterial::from_base64(&repr)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            config: None,
            signing_key: None,
            token_ttl_secs: default_token_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            static_dir: default_static_dir(),
            media_dir: default_media_dir(),
            exempt_paths: default_always_exempt(),
            public_paths: default_anonymous_exempt(),
            videos: default_videos(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> anyhow::Result<Self> {
        // First parse CLI args
        let mut config = Config::parse();

        // If a config file is specified, load it and merge
        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If CLI value is default, use file value
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.token_ttl_secs == default_token_ttl_secs() {
            self.token_ttl_secs = file_config.token_ttl_secs;
        }
        if self.request_timeout_secs == default_request_timeout_secs() {
            self.request_timeout_secs = file_config.request_timeout_secs;
        }
        if self.static_dir == default_static_dir() {
            self.static_dir = file_config.static_dir;
        }
        if self.media_dir == default_media_dir() {
            self.media_dir = file_config.media_dir;
        }
        if self.exempt_paths == default_always_exempt() {
            self.exempt_paths = file_config.exempt_paths;
        }
        if self.public_paths == default_anonymous_exempt() {
            self.public_paths = file_config.public_paths;
        }

        // The catalog only comes from the file
        self.videos = file_config.videos;

        // For Option fields, CLI (or env) takes precedence if Some
        if self.signing_key.is_none() {
            self.signing_key = file_config.signing_key;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.token_ttl_secs == 0 {
            return Err(anyhow::anyhow!("Token TTL must be greater than zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be greater than zero"));
        }
        if self.static_dir.is_empty() || self.media_dir.is_empty() {
            return Err(anyhow::anyhow!("static_dir and media_dir cannot be empty"));
        }

        for (id, entry) in &self.videos {
            entry.validate(id)?;
        }

        self.exemption_policy()?;
        Ok(())
    }

    pub fn exemption_policy(&self) -> anyhow::Result<ExemptionPolicy> {
        ExemptionPolicy::from_patterns(&self.exempt_paths, &self.public_paths)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Default value functions
fn default_port() -> u16 {
    8000
}

fn default_token_ttl_secs() -> u64 {
    60 * 60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_media_dir() -> String {
    "media".to_string()
}
