// Request index - request id to feedback audio location
//
// Persisted as `requests.json` at the root of the feedback directory and
// replaced via temp-file-and-rename. The sidecars are the source of
// truth: a missing or unreadable index is rebuilt from their `request_id`
// fields, and the manager rescans them when a lookup misses.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::record::FeedbackRecord;
use crate::error::{PipelineError, Result};

pub const INDEX_FILE_NAME: &str = "requests.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestIndex {
    entries: BTreeMap<String, PathBuf>,
}

impl RequestIndex {
    /// Load the index, rebuilding it from sidecars under `class_dirs` if needed
    pub fn load_or_rebuild(feedback_dir: &Path, class_dirs: &[PathBuf]) -> Self {
        let path = feedback_dir.join(INDEX_FILE_NAME);
        match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(index) => return index,
                Err(err) => warn!(
                    "[FeedbackManager] Request index {} unreadable ({}), rebuilding",
                    path.display(),
                    err
                ),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("[FeedbackManager] No request index yet, scanning sidecars");
            }
            Err(err) => warn!(
                "[FeedbackManager] Could not read {} ({}), rebuilding",
                path.display(),
                err
            ),
        }
        Self::rebuild(class_dirs)
    }

    /// Scan sidecars under `class_dirs` for their request ids
    pub fn rebuild(class_dirs: &[PathBuf]) -> Self {
        let mut index = Self::default();
        for dir in class_dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let sidecar = entry.path();
                if sidecar.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let record: FeedbackRecord = match fs::read(&sidecar)
                    .ok()
                    .and_then(|bytes| serde_json::from_slice(&bytes).ok())
                {
                    Some(record) => record,
                    None => continue,
                };
                if let (Some(request_id), Some(file_name)) =
                    (record.request_id, record.saved_path.file_name())
                {
                    index.insert(request_id, sidecar.with_file_name(file_name));
                }
            }
        }
        index
    }

    pub fn get(&self, request_id: &str) -> Option<&PathBuf> {
        self.entries.get(request_id)
    }

    pub fn insert(&mut self, request_id: String, audio_path: PathBuf) {
        self.entries.insert(request_id, audio_path);
    }

    pub fn remove(&mut self, request_id: &str) -> Option<PathBuf> {
        self.entries.remove(request_id)
    }

    /// Drop entries whose audio file no longer exists
    pub fn prune_missing(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, path| path.is_file());
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, feedback_dir: &Path) -> Result<()> {
        let path = feedback_dir.join(INDEX_FILE_NAME);
        let tmp = feedback_dir.join(format!("{}.tmp", INDEX_FILE_NAME));
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| PipelineError::serialization("encoding request index", err))?;
        fs::write(&tmp, bytes)
            .map_err(|err| PipelineError::io(format!("writing {}", tmp.display()), err))?;
        fs::rename(&tmp, &path)
            .map_err(|err| PipelineError::io(format!("replacing {}", path.display()), err))
    }
}
