//! Configuration
//!
//! Credentials, tag file locations and HTTP settings come from a YAML file
//! (default `~/.synctags.yaml`) and can be overridden from the environment:
//!
//! ```yaml
//! qualys:
//!   base_url: https://qualysapi.qualys.com
//!   username: api-user
//!   password: ...
//!   output: qualys_tags.yml
//! crowdstrike:
//!   base_url: https://api.us-2.crowdstrike.com
//!   client_id: ...
//!   client_secret: ...
//! ninjaone:
//!   base_url: https://app.ninjarmm.com
//!   client_id: ...
//!   client_secret: ...
//! http:
//!   timeout_secs: 30
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::tags::providers::ninjaone::DEFAULT_SCOPE;
use crate::tags::providers::{CrowdStrikeCredentials, NinjaOneCredentials, QualysCredentials};
use crate::tags::{TagPaths, Vendor};

/// Config file name looked up in the home directory
pub const DEFAULT_CONFIG_FILE: &str = ".synctags.yaml";

/// Optional per-vendor overrides of the tag file locations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSettings {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

#[derive(Clone, Default, Deserialize)]
pub struct QualysSection {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(flatten)]
    pub files: FileSettings,
}

#[derive(Clone, Default, Deserialize)]
pub struct CrowdStrikeSection {
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub member_cid: Option<String>,
    #[serde(flatten)]
    pub files: FileSettings,
}

#[derive(Clone, Default, Deserialize)]
pub struct NinjaOneSection {
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    #[serde(flatten)]
    pub files: FileSettings,
}

/// Shared HTTP transport settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("synctags/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Top-level configuration
#[derive(Clone, Default, Deserialize)]
pub struct SyncTagsConfig {
    #[serde(default)]
    pub qualys: QualysSection,
    #[serde(default)]
    pub crowdstrike: CrowdStrikeSection,
    #[serde(default)]
    pub ninjaone: NinjaOneSection,
    #[serde(default)]
    pub http: HttpSettings,
}

impl SyncTagsConfig {
    /// Load from `path`, or from `~/.synctags.yaml` when no path is given,
    /// then apply environment overrides.
    ///
    /// An explicit path must exist; a missing default file is ignored.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match home::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE)) {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => {
                    debug!("No config file found, using environment only");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        Ok(config)
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Option<Self> = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Using config file: {}", path.display());
        Ok(config.unwrap_or_default())
    }

    /// Override settings from environment variables such as `QUALYS_USERNAME`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut Option<String>, key: &str| {
            if let Some(value) = lookup(key) {
                debug!(key = %key, "Config override from environment");
                *target = Some(value);
            }
        };

        set(&mut self.qualys.base_url, "QUALYS_BASE_URL");
        set(&mut self.qualys.username, "QUALYS_USERNAME");
        set(&mut self.qualys.password, "QUALYS_PASSWORD");

        set(&mut self.crowdstrike.base_url, "CROWDSTRIKE_BASE_URL");
        set(&mut self.crowdstrike.client_id, "CROWDSTRIKE_CLIENT_ID");
        set(&mut self.crowdstrike.client_secret, "CROWDSTRIKE_CLIENT_SECRET");
        set(&mut self.crowdstrike.member_cid, "CROWDSTRIKE_MEMBER_CID");

        set(&mut self.ninjaone.base_url, "NINJAONE_BASE_URL");
        set(&mut self.ninjaone.client_id, "NINJAONE_CLIENT_ID");
        set(&mut self.ninjaone.client_secret, "NINJAONE_CLIENT_SECRET");
        set(&mut self.ninjaone.scope, "NINJAONE_SCOPE");
    }

    pub fn qualys_credentials(&self) -> Result<QualysCredentials> {
        let q = &self.qualys;
        match (non_empty(&q.base_url), non_empty(&q.username), non_empty(&q.password)) {
            (Some(base_url), Some(username), Some(password)) => Ok(QualysCredentials {
                base_url,
                username,
                password,
            }),
            _ => bail!("Qualys credentials not set in config or env"),
        }
    }

    pub fn crowdstrike_credentials(&self) -> Result<CrowdStrikeCredentials> {
        let cs = &self.crowdstrike;
        match (
            non_empty(&cs.base_url),
            non_empty(&cs.client_id),
            non_empty(&cs.client_secret),
        ) {
            (Some(base_url), Some(client_id), Some(client_secret)) => Ok(CrowdStrikeCredentials {
                base_url,
                client_id,
                client_secret,
                member_cid: non_empty(&cs.member_cid),
            }),
            _ => bail!("CrowdStrike credentials not set in config or env"),
        }
    }

    pub fn ninjaone_credentials(&self) -> Result<NinjaOneCredentials> {
        let n = &self.ninjaone;
        match (
            non_empty(&n.base_url),
            non_empty(&n.client_id),
            non_empty(&n.client_secret),
        ) {
            (Some(base_url), Some(client_id), Some(client_secret)) => Ok(NinjaOneCredentials {
                base_url,
                client_id,
                client_secret,
                scope: non_empty(&n.scope).unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            }),
            _ => bail!("NinjaOne credentials not set in config or env"),
        }
    }

    fn files(&self, vendor: Vendor) -> &FileSettings {
        match vendor {
            Vendor::Qualys => &self.qualys.files,
            Vendor::CrowdStrike => &self.crowdstrike.files,
            Vendor::NinjaOne => &self.ninjaone.files,
        }
    }

    /// Resolve tag file paths: CLI flag, then config, then `<vendor>_tags.yml`
    pub fn tag_paths(
        &self,
        vendor: Vendor,
        input_flag: Option<PathBuf>,
        output_flag: Option<PathBuf>,
    ) -> TagPaths {
        let defaults = TagPaths::for_vendor(vendor, Path::new(""));
        let files = self.files(vendor);

        TagPaths {
            input: input_flag
                .or_else(|| files.input.clone())
                .unwrap_or(defaults.input),
            output: output_flag
                .or_else(|| files.output.clone())
                .unwrap_or(defaults.output),
        }
    }

    /// Build the shared HTTP client injected into every adapter
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .user_agent(&self.http.user_agent)
            .build()
            .context("Failed to create HTTP client")
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}
