#![deny(missing_docs)]
//! Filesystem-backed implementation of vigil-core's StateStore trait.
//!
//! Each scope maps to a readable subdirectory under the root and each
//! key to an escaped `.json` file inside it:
//!
//! ```text
//! root/
//!   stream-combat/
//!     cursor.json
//!     seen.json
//!   schedule/
//!     0x5e1f.json
//!   agent-aggro/
//!     cursor.json
//! ```
//!
//! Writes are atomic: the value goes to `<file>.tmp` first and is then
//! renamed into place.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use vigil_core::error::StateError;
use vigil_core::state::{Scope, StateStore};

const EXT: &str = ".json";
const TMP_EXT: &str = ".json.tmp";

/// Filesystem-backed state store.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`. Directories are created lazily on
    /// first write.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Create a store and make sure `root` exists and is a directory, so
    /// an unusable state directory is reported at startup rather than on
    /// the first cursor write.
    pub async fn open(root: &Path) -> Result<Self, StateError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| StateError::WriteFailed(format!("{}: {e}", root.display())))?;
        Ok(Self::new(root))
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_dir(&self, scope: &Scope) -> PathBuf {
        self.root.join(scope_dir_name(scope))
    }

    fn key_path(&self, scope: &Scope, key: &str) -> PathBuf {
        self.scope_dir(scope).join(format!("{}{EXT}", escape(key)))
    }
}

/// Directory name for a scope. Names embed the escaped id so the layout
/// stays inspectable by hand.
fn scope_dir_name(scope: &Scope) -> String {
    match scope {
        Scope::Stream(id) => format!("stream-{}", escape(id.as_str())),
        Scope::Schedule => "schedule".to_owned(),
        Scope::Agent(id) => format!("agent-{}", escape(id.as_str())),
        Scope::Global => "global".to_owned(),
        Scope::Custom(name) => format!("custom-{}", escape(name)),
        _ => format!(
            "other-{}",
            escape(&serde_json::to_string(scope).unwrap_or_default())
        ),
    }
}

/// Escape everything outside `[A-Za-z0-9_.-]` as `%XX` (UTF-8 bytes).
/// A leading `.` is escaped too so keys never become hidden files.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, byte) in raw.bytes().enumerate() {
        let plain = byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') || (byte == b'.' && i > 0);
        if plain {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn unescape(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = escaped.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn key_from_filename(filename: &str) -> Option<String> {
    if filename.ends_with(TMP_EXT) {
        return None;
    }
    unescape(filename.strip_suffix(EXT)?)
}

fn io_err(path: &Path, e: std::io::Error) -> StateError {
    StateError::WriteFailed(format!("{}: {e}", path.display()))
}

#[async_trait]
impl StateStore for FsStore {
    async fn read(
        &self,
        scope: &Scope,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StateError> {
        let path = self.key_path(scope, key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StateError::Serialization(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::Other(Box::new(e))),
        }
    }

    async fn write(
        &self,
        scope: &Scope,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StateError> {
        let dir = self.scope_dir(scope);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_err(&dir, e))?;

        let path = self.key_path(scope, key);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(&value)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(&path, e));
        }
        tracing::trace!(path = %path.display(), "state written");
        Ok(())
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<(), StateError> {
        let path = self.key_path(scope, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    async fn list(&self, scope: &Scope, prefix: &str) -> Result<Vec<String>, StateError> {
        let dir = self.scope_dir(scope);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StateError::Other(Box::new(e))),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StateError::Other(Box::new(e)))?
        {
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(key_from_filename) else {
                continue;
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
