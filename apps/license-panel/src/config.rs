use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_SECRET_KEY: &str = "dev-secret-change-me-in-production";

const CONFIG_PATHS: [&str; 2] = [
    "/etc/license-panel/config.toml",
    "./license-panel.toml",
];

/// Where a loaded `Config` came from, reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Environment => f.write_str("environment"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    pub admin_password: String,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("licenses.db")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// Explicit file first, then the well-known paths, then the environment.
    /// Runs before tracing is initialized, so the source is returned rather than logged.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            return Ok((Self::from_toml_str(&contents)?, ConfigSource::File(path.to_path_buf())));
        }

        for path in CONFIG_PATHS {
            if let Ok(contents) = fs::read_to_string(path) {
                return Ok((Self::from_toml_str(&contents)?, ConfigSource::File(PathBuf::from(path))));
            }
        }

        let config = Self::from_lookup(|name| std::env::var(name).ok())?;
        Ok((config, ConfigSource::Environment))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Invalid config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Build from environment-style variables supplied by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            admin_username: lookup("ADMIN_USERNAME").unwrap_or_else(default_admin_username),
            admin_password: lookup("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?,
            secret_key: lookup("SECRET_KEY").unwrap_or_else(default_secret_key),
            db_path: lookup("DB_PATH").map(PathBuf::from).unwrap_or_else(default_db_path),
            host: lookup("HOST").unwrap_or_else(default_host),
            port: match lookup("PORT") {
                Some(raw) => raw.trim().parse().with_context(|| format!("PORT must be a number, got {:?}", raw))?,
                None => default_port(),
            },
            log_dir: lookup("LOG_DIR").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.admin_username.trim().is_empty() {
            anyhow::bail!("admin_username must not be empty");
        }
        if self.admin_password.is_empty() {
            anyhow::bail!("admin_password must not be empty");
        }
        if self.secret_key.is_empty() {
            anyhow::bail!("secret_key must not be empty");
        }
        Ok(())
    }

    /// Constant-time check of admin credentials. Both fields are always
    /// compared so a wrong username costs the same as a wrong password.
    pub fn credentials_match(&self, username: &str, password: &str) -> bool {
        let username_ok = self.secret_matches(username, &self.admin_username);
        let password_ok = self.secret_matches(password, &self.admin_password);
        username_ok & password_ok
    }

    /// MAC both sides under `secret_key` so lengths never leak, then verify
    /// the tags with the constant-time comparison from `hmac`.
    fn secret_matches(&self, candidate: &str, expected: &str) -> bool {
        let (Ok(mut expected_mac), Ok(mut candidate_mac)) = (
            HmacSha256::new_from_slice(self.secret_key.as_bytes()),
            HmacSha256::new_from_slice(self.secret_key.as_bytes()),
        ) else {
            return false;
        };

        expected_mac.update(expected.as_bytes());
        let expected_tag = expected_mac.finalize().into_bytes();

        candidate_mac.update(candidate.as_bytes());
        candidate_mac.verify_slice(&expected_tag).is_ok()
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("db_path", &self.db_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}
