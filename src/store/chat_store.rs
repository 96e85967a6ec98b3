// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::{decode_quest_payload, MalformedQuestError, SessionState};

const CHATS_FILENAME: &str = "questmap-chats.json";
const KEYS_FILENAME: &str = "questmap-keys.json";

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    SymlinkRefused {
        path: PathBuf,
    },
    /// Refused to export a result that does not decode into a quest.
    InvalidExport {
        path: PathBuf,
        source: MalformedQuestError,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
            Self::InvalidExport { path, source } => {
                write!(f, "cannot export invalid quest to {path:?}: {source}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::SymlinkRefused { .. } => None,
            Self::InvalidExport { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to stable
    /// storage where possible. Exact guarantees are platform/filesystem-dependent.
    Durable,
}

/// On-disk home of the app: chat state and API keys live side by side in one
/// directory, each as a single JSON file replaced atomically on save.
#[derive(Debug, Clone)]
pub struct ChatStore {
    root: PathBuf,
    durability: WriteDurability,
}

impl ChatStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), durability: WriteDurability::default() }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chats_path(&self) -> PathBuf {
        self.root.join(CHATS_FILENAME)
    }

    pub fn keys_path(&self) -> PathBuf {
        self.root.join(KEYS_FILENAME)
    }

    pub fn load_state(&self) -> Result<SessionState, StoreError> {
        let path = self.chats_path();
        let raw = fs::read_to_string(&path)
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Json { path, source })
    }

    /// Missing state file means a fresh install; start empty and persist so
    /// the next load finds something.
    pub fn load_or_init_state(&self) -> Result<SessionState, StoreError> {
        match self.load_state() {
            Ok(state) => Ok(state),
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                let state = SessionState::default();
                self.save_state(&state)?;
                Ok(state)
            }
            Err(err) => Err(err),
        }
    }

    pub fn save_state(&self, state: &SessionState) -> Result<(), StoreError> {
        let path = self.chats_path();
        let raw = serde_json::to_string_pretty(state)
            .map_err(|source| StoreError::Json { path: path.clone(), source })?;
        write_atomic(&path, format!("{raw}\n").as_bytes(), self.durability)
    }

    /// Provider name → key. A missing keys file reads as no keys configured.
    pub fn load_api_keys(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let path = self.keys_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new())
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Json { path, source })
    }

    pub fn save_api_keys(&self, keys: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let path = self.keys_path();
        let raw = serde_json::to_string_pretty(keys)
            .map_err(|source| StoreError::Json { path: path.clone(), source })?;
        write_atomic(&path, format!("{raw}\n").as_bytes(), self.durability)
    }

    /// Write a chat result to `path` as pretty-printed quest JSON.
    ///
    /// The raw result text is decoded first; exporting a result that does not
    /// decode is refused rather than writing whatever the backend returned.
    pub fn export_quest(&self, path: &Path, raw_result: &str) -> Result<(), StoreError> {
        let doc = decode_quest_payload(raw_result).map_err(|source| StoreError::InvalidExport {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = doc.to_json_string_pretty();
        write_atomic(path, format!("{raw}\n").as_bytes(), self.durability)
    }
}

/// Replace `path` atomically: write a sibling temp file, then rename it into
/// place. Refuses to write through a symlink at the target.
fn write_atomic(path: &Path, contents: &[u8], durability: WriteDurability) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no parent"),
        });
    };
    let Some(file_name) = path.file_name() else {
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source: io::Error::other("path has no file name"),
        });
    };

    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
    }

    match fs::symlink_metadata(path) {
        Ok(md) if md.file_type().is_symlink() => {
            return Err(StoreError::SymlinkRefused { path: path.to_path_buf() });
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
    }

    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let tmp_path =
        parent.join(format!(".questmap.tmp.{}.{}", file_name.to_string_lossy(), nanos));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;

    file.write_all(contents)
        .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;

    if durability == WriteDurability::Durable {
        file.sync_all()
            .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
    }
    drop(file);

    if let Err(source) = rename_overwrite(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io { path: path.to_path_buf(), source });
    }

    if durability == WriteDurability::Durable {
        #[cfg(unix)]
        {
            let dir = fs::File::open(parent)
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
            dir.sync_all()
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }
    }

    Ok(())
}

fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                let _ = fs::remove_file(to);
                fs::rename(from, to)
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}

#[cfg(test)]
mod tests;
