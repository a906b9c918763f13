//! Signed-in state: the bearer token and the backend it belongs to.
//!
//! Loaded once at startup and handed to the API client; removed on logout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::Client;
use crate::config::{AUTH_FILE_NAME, CONFIG_DIR_NAME};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub api_base: String,
    pub email: String,
    pub token: String,
    pub login_time: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(api_base: impl Into<String>, email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            email: email.into(),
            token: token.into(),
            login_time: Utc::now(),
        }
    }

    /// API client carrying this session's token.
    pub fn client(&self) -> Result<Client> {
        Client::new(&self.api_base, Some(self.token.clone()))
            .with_context(|| format!("building client for {}", self.api_base))
    }
}

/// Where sessions are persisted. Tests point it at a temp dir.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config dir>/taskdesk`
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join(CONFIG_DIR_NAME);
        Ok(Self::new(dir))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(AUTH_FILE_NAME)
    }

    pub fn load(&self) -> Result<Option<AuthSession>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        debug!(path = %path.display(), "loaded session");
        Ok(Some(session))
    }

    pub fn save(&self, session: &AuthSession) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(session)?)
            .with_context(|| format!("writing {}", path.display()))?;
        restrict_permissions(&path)?;
        Ok(path)
    }

    /// Returns whether a session file was removed.
    pub fn clear(&self) -> Result<bool> {
        let path = self.path();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        Ok(true)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> { Ok(()) }
