//! JSON-file backend.
//!
//! The whole map lives in memory and is rewritten to disk on every `put`:
//! serialised to a sibling temp file, then renamed over the target so a crash
//! never leaves a half-written document. Values are base64-encoded so the
//! backend stays byte-exact for arbitrary blobs.

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::RwLock,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::{Backend, BackendError};
use super::UserId;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    users: BTreeMap<UserId, BTreeMap<String, String>>,
}

/// Backend persisted as a single JSON document.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    doc: RwLock<Document>,
}

impl FileBackend {
    /// Open the document at `path`, starting empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let doc = match fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), users = doc.users.len(), "file backend opened");
        Ok(Self {
            path,
            doc: RwLock::new(doc),
        })
    }

    fn persist(&self, doc: &Document) -> Result<(), BackendError> {
        let raw = serde_json::to_vec_pretty(doc)?;
        let tmp = temp_path(&self.path);
        let written = write_synced(&tmp, &raw).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %cleanup, "temp file not removed");
                }
            }
            return Err(e.into());
        }
        Ok(())
    }
}

fn write_synced(path: &Path, raw: &[u8]) -> std::io::Result<()> {
    let mut f = fs::File::create(path)?;
    f.write_all(raw)?;
    f.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

impl Backend for FileBackend {
    fn put(&self, owner: UserId, key: &str, value: Bytes) -> Result<(), BackendError> {
        let mut doc = self.doc.write().map_err(|_| BackendError::Poisoned)?;
        let previous = doc
            .users
            .entry(owner)
            .or_default()
            .insert(key.to_owned(), STANDARD.encode(&value));

        if let Err(e) = self.persist(&doc) {
            // Keep memory in step with what is on disk.
            let fields = doc.users.entry(owner).or_default();
            match previous {
                Some(old) => {
                    fields.insert(key.to_owned(), old);
                }
                None => {
                    fields.remove(key);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn get(&self, owner: UserId, key: &str) -> Result<Option<Bytes>, BackendError> {
        let doc = self.doc.read().map_err(|_| BackendError::Poisoned)?;
        doc.users
            .get(&owner)
            .and_then(|fields| fields.get(key))
            .map(|encoded| {
                STANDARD
                    .decode(encoded)
                    .map(Bytes::from)
                    .map_err(|_| BackendError::Corrupt(owner))
            })
            .transpose()
    }
}
