use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use tracing::debug;

use super::{PersistenceAdapter, Result};
use crate::errors::StorageError;
use crate::ledger::{LedgerSnapshot, CURRENT_SCHEMA_VERSION};
use crate::utils::{ensure_dir, write_atomic, PathResolver};

const FILE_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const DEFAULT_RETENTION: usize = 5;

/// Stores one snapshot as pretty JSON under `<root>/data/<key>.json`.
///
/// The previous file is copied to `<root>/backups/` before each overwrite and
/// older copies beyond the retention limit are pruned.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
    backups_dir: PathBuf,
    key: String,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, key: &str, retention: Option<usize>) -> Result<Self> {
        let base = PathResolver::resolve_base(root);
        let data_dir = PathResolver::data_dir_in(&base);
        let backups_dir = PathResolver::backup_dir_in(&base);
        ensure_dir(&data_dir)?;
        ensure_dir(&backups_dir)?;
        let key = canonical_name(key);
        Ok(Self {
            path: data_dir.join(format!("{key}.{FILE_EXTENSION}")),
            backups_dir,
            key,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", self.key);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            match path.file_name().and_then(|name| name.to_str()) {
                Some(name) if name.starts_with(&prefix) => entries.push(name.to_string()),
                _ => continue,
            }
        }
        entries.sort_by(|a, b| b.cmp(a));
        Ok(entries)
    }

    /// Reads a backup without making it the current snapshot.
    pub fn load_backup(&self, backup_name: &str) -> Result<LedgerSnapshot> {
        let path = self.backups_dir.join(backup_name);
        if !path.exists() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("backup `{backup_name}` not found"),
            )));
        }
        read_snapshot(&path)
    }

    fn backup_existing_file(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        ensure_dir(&self.backups_dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT);
        let backup = self
            .backups_dir
            .join(format!("{}_{timestamp}.{FILE_EXTENSION}", self.key));
        fs::copy(&self.path, &backup)?;
        self.prune_backups()
    }

    fn prune_backups(&self) -> Result<()> {
        for stale in self.list_backups()?.iter().skip(self.retention) {
            let _ = fs::remove_file(self.backups_dir.join(stale));
        }
        Ok(())
    }
}

impl PersistenceAdapter for JsonStorage {
    fn load(&self) -> Result<Option<LedgerSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        read_snapshot(&self.path).map(Some)
    }

    fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        self.backup_existing_file()?;
        write_atomic(&self.path, &json)?;
        debug!(path = %self.path.display(), "saved ledger snapshot");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            self.backup_existing_file()?;
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<LedgerSnapshot> {
    let data = fs::read_to_string(path)?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&data)?;
    if snapshot.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(StorageError::SchemaVersion(snapshot.schema_version));
    }
    Ok(snapshot)
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches(|c| c == '_' || c == '-').is_empty() {
        "ledger".into()
    } else {
        sanitized
    }
}
