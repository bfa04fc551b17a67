//! Configuration file management for impactree.
//!
//! Provides a TOML-based config file at `~/.config/impactree/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use impactree_db::config::DbConfig;

pub const MEDIA_ROOT_ENV_VAR: &str = "IMPACTREE_MEDIA_ROOT";
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MEDIA_ROOT: &str = "./media";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub media: MediaSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MediaSection {
    /// Directory uploaded images are written to.
    pub root: PathBuf,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_MEDIA_ROOT),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the impactree config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/impactree` or
/// `~/.config/impactree`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("impactree");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("impactree")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load the config file if there is one. A file that exists but does not
/// parse is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix since it holds the database URL.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct ImpactreeConfig {
    pub db_config: DbConfig,
    pub server: ServerSection,
    pub media_root: PathBuf,
}

impl ImpactreeConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `IMPACTREE_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Media root: `cli_media_root` > `IMPACTREE_MEDIA_ROOT` > `media.root` > `./media`
    /// - Bind/port: `server` section > `127.0.0.1:8000` (the serve command applies its own flags)
    pub fn resolve(cli_db_url: Option<&str>, cli_media_root: Option<&Path>) -> Result<Self> {
        let file_config = load_config()?;

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let media_root = if let Some(root) = cli_media_root {
            root.to_path_buf()
        } else if let Ok(root) = std::env::var(MEDIA_ROOT_ENV_VAR) {
            PathBuf::from(root)
        } else if let Some(ref cfg) = file_config {
            cfg.media.root.clone()
        } else {
            PathBuf::from(DEFAULT_MEDIA_ROOT)
        };

        let server = file_config.map(|cfg| cfg.server).unwrap_or_default();

        Ok(Self {
            db_config: DbConfig::new(db_url),
            server,
            media_root,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
