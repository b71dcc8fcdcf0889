//! Portal configuration: data directory resolution and fixed limits.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Rows per list page.
pub const PAGE_SIZE: usize = 20;
/// Idle time before typed search text is committed.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
/// Characters of a comment body quoted in its activity entry.
pub const COMMENT_PREVIEW_CHARS: usize = 60;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const SESSION_LIFETIME_DAYS: i64 = 7;
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

pub const DATA_DIR_ENV: &str = "KARC_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".karc";
const DB_FILE: &str = "portal.db";
const SESSION_FILE: &str = "session.json";

/// Where the portal keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    data_dir: PathBuf,
}

impl PortalConfig {
    /// Resolve the data directory: explicit flag, then `KARC_DATA_DIR`,
    /// then `./.karc`.
    #[must_use]
    pub fn resolve(flag: Option<&Path>) -> Self {
        Self::resolve_with(flag, std::env::var_os(DATA_DIR_ENV))
    }

    /// [`Self::resolve`] with the environment value passed in.
    #[must_use]
    pub fn resolve_with(flag: Option<&Path>, env: Option<OsString>) -> Self {
        let data_dir = flag.map(Path::to_path_buf).unwrap_or_else(|| {
            env.filter(|v| !v.is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from)
        });
        Self { data_dir }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    /// Whether `karc init` has created the database.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.db_path().exists()
    }
}
