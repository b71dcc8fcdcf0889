//! Persisted access token for session restore.
//!
//! Uses advisory file locking (via `fs2`) so two concurrent `karc`
//! invocations never read a half-written file. On Unix the file holds a
//! bearer token and is kept owner-only (0600).

use std::fs::{self, File, OpenOptions};
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::provider::IssuedSession;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub user_id: String,
    pub email: String,
    pub expires_at: String,
}

impl From<&IssuedSession> for StoredSession {
    fn from(issued: &IssuedSession) -> Self {
        Self {
            access_token: issued.access_token.clone(),
            user_id: issued.user.id.clone(),
            email: issued.user.email.clone(),
            expires_at: issued.expires_at.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create session directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(false);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(&self.path)
            .with_context(|| format!("Failed to open session file: {}", self.path.display()))?;
        restrict_to_owner(&file)?;
        file.lock_exclusive()
            .context("Failed to acquire exclusive lock")?;
        file.set_len(0).context("Failed to truncate session file")?;
        file.write_all(json.as_bytes())
            .context("Failed to write session file")?;
        file.flush().context("Failed to flush session file")?;
        Ok(())
    }

    /// Read the stored session, if any.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        let mut file = match OpenOptions::new().read(true).open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to open session file: {}", self.path.display())
                })
            }
        };
        file.lock_shared()
            .context("Failed to acquire shared lock")?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read session file")?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let session = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed session file: {}", self.path.display()))?;
        Ok(Some(session))
    }

    /// Forget the stored session. Missing file is fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session file: {}", self.path.display())),
        }
    }
}

/// Tighten a file that predates the 0600 default.
#[cfg(unix)]
fn restrict_to_owner(file: &File) -> Result<()> {
    let mut perms = file
        .metadata()
        .context("Failed to stat session file")?
        .permissions();
    if perms.mode() & 0o777 != 0o600 {
        perms.set_mode(0o600);
        file.set_permissions(perms)
            .context("Failed to restrict session file permissions")?;
    }
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restrict_to_owner(_file: &File) -> Result<()> {
    Ok(())
}
