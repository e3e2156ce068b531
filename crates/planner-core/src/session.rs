use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use planner_shared::LoginUser;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// The signed-in user, remembered between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl From<LoginUser> for Session {
    fn from(user: LoginUser) -> Self {
        Self {
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join("session.json");
        debug!(session = %path.display(), "opened session file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session. A missing or unreadable marker means signed out.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> Option<Session> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(error = %err, file = %self.path.display(), "failed reading session");
                return None;
            }
        };
        match serde_json::from_str::<Session>(raw.trim()) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(error = %err, file = %self.path.display(), "ignoring corrupt session");
                None
            }
        }
    }

    #[tracing::instrument(skip(self, session), fields(email = %session.email))]
    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, session)?;
        writeln!(temp)?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        info!("stored session");
        Ok(())
    }

    /// Removes the marker. Returns whether a session existed.
    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("cleared session");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("failed removing {}", self.path.display()))
            }
        }
    }
}
