//! Named connection profiles stored as TOML.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::builder::CommcellBuilder;

/// Name of the profile stored in `config.toml`.
pub const DEFAULT_PROFILE: &str = "default";

/// Connection settings for one Commcell.
///
/// ```toml
/// host = "webconsole.example.com"
/// username = "admin"
/// force_https = true
/// timeout_secs = 60
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Web console host name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Explicit web service URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_service_url: Option<String>,

    /// User name for password login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for password login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Existing session token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Only try HTTPS during discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_https: Option<bool>,

    /// PEM certificate used to verify the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<PathBuf>,

    /// Whether to verify TLS certificates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,

    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Proxy URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl ProfileConfig {
    /// Returns the platform configuration directory.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "commcell-sdk", "commcell-sdk")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns the path of a named profile inside `dir`.
    #[must_use]
    pub fn profile_path_in(dir: &Path, profile: &str) -> PathBuf {
        if profile == DEFAULT_PROFILE {
            dir.join("config.toml")
        } else {
            dir.join(format!("{profile}.toml"))
        }
    }

    /// Returns the path of a named profile in the platform directory.
    #[must_use]
    pub fn profile_path(profile: &str) -> Option<PathBuf> {
        Self::config_dir().map(|dir| Self::profile_path_in(&dir, profile))
    }

    /// Loads a named profile from the platform configuration directory.
    ///
    /// A profile that does not exist yields an empty configuration.
    pub fn load(profile: &str) -> Result<Self> {
        let path = Self::profile_path(profile)
            .ok_or_else(|| Error::config("Could not determine config directory"))?;

        if !path.exists() {
            debug!(profile, "Profile not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads a profile from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let profile = toml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded profile");
        Ok(profile)
    }

    /// Saves this profile under `profile` in the platform directory.
    pub fn save(&self, profile: &str) -> Result<()> {
        let path = Self::profile_path(profile)
            .ok_or_else(|| Error::config("Could not determine config directory"))?;
        self.save_to(&path)
    }

    /// Saves this profile to an explicit file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize profile: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Lists the profiles stored in `dir`.
    pub fn list_profiles_in(dir: &Path) -> Result<Vec<String>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut profiles = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "toml") {
                if let Some(stem) = path.file_stem() {
                    let name = stem.to_string_lossy();
                    if name == "config" {
                        profiles.push(DEFAULT_PROFILE.to_string());
                    } else {
                        profiles.push(name.into_owned());
                    }
                }
            }
        }

        profiles.sort();
        Ok(profiles)
    }

    /// Converts the profile into a session builder.
    #[must_use]
    pub fn into_builder(self) -> CommcellBuilder {
        let mut builder = CommcellBuilder::new();

        if let Some(host) = self.host {
            builder = builder.host(host);
        }
        if let Some(url) = self.web_service_url {
            builder = builder.web_service_url(url);
        }
        if let Some(username) = self.username {
            builder = builder.username(username);
        }
        if let Some(password) = self.password {
            builder = builder.password(password);
        }
        if let Some(token) = self.token {
            builder = builder.token(token);
        }
        if let Some(force) = self.force_https {
            builder = builder.force_https(force);
        }
        if let Some(path) = self.certificate_path {
            builder = builder.certificate_path(path);
        }
        if let Some(verify) = self.tls_verify {
            builder = builder.tls_verify(verify);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        if let Some(proxy) = self.proxy {
            builder = builder.proxy(proxy);
        }
        builder
    }
}

impl std::fmt::Debug for ProfileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileConfig")
            .field("host", &self.host)
            .field("web_service_url", &self.web_service_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("force_https", &self.force_https)
            .finish_non_exhaustive()
    }
}
