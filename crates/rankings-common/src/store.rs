/// Whole-file persistence for the rankings document.
///
/// The document is read in full, mutated in memory, and written back in full.
/// Output is pretty-printed with two-space indentation and non-ASCII text is
/// written literally. Writes are not atomic: a crash mid-write can truncate
/// the file.
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CommonError;
use crate::model::RankingDocument;

#[derive(Debug, Clone)]
pub struct RankingStore {
    path: PathBuf,
}

impl RankingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<RankingDocument, CommonError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommonError::DocumentNotFound(self.path.clone())
            } else {
                CommonError::Io {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;
        let doc: RankingDocument = serde_json::from_str(&content)?;
        debug!(
            path = %self.path.display(),
            categories = doc.categories.len(),
            fighters = doc.fighter_count(),
            "loaded rankings document"
        );
        Ok(doc)
    }

    pub fn save(&self, doc: &RankingDocument) -> Result<(), CommonError> {
        save_to(&self.path, doc)
    }
}

/// Write `doc` to an arbitrary path, replacing any existing file.
pub fn save_to(path: &Path, doc: &RankingDocument) -> Result<(), CommonError> {
    let json = to_pretty_json(doc)?;
    std::fs::write(path, json).map_err(|e| CommonError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), "wrote rankings document");
    Ok(())
}

/// Canonical serialization: two-space indent, literal UTF-8.
pub fn to_pretty_json(doc: &RankingDocument) -> Result<String, CommonError> {
    Ok(serde_json::to_string_pretty(doc)?)
}
