use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::engine_debug;
use harvester_core::{FetchResult, WorkUnit};

use crate::fetch::SearchClient;
use crate::filename::checkpoint_filename;
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("checkpoint store unavailable: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to read checkpoint {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt checkpoint {path:?}: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("failed to encode checkpoint for {unit}: {message}")]
    Encode { unit: String, message: String },
}

/// One JSON checkpoint per unit. A present checkpoint marks the unit complete,
/// even when it holds zero articles.
#[derive(Debug, Clone)]
pub struct UnitCache {
    writer: AtomicFileWriter,
}

impl UnitCache {
    /// Open (and create if needed) the checkpoint directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        ensure_output_dir(&dir)?;
        Ok(Self {
            writer: AtomicFileWriter::new(dir),
        })
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn path_for(&self, unit: &WorkUnit) -> PathBuf {
        self.dir()
            .join(checkpoint_filename(&unit.query, unit.label()))
    }

    pub fn has(&self, unit: &WorkUnit) -> bool {
        self.path_for(unit).is_file()
    }

    pub fn load(&self, unit: &WorkUnit) -> Result<FetchResult, CacheError> {
        let path = self.path_for(unit);
        let bytes = fs::read(&path).map_err(|source| CacheError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|err| CacheError::Corrupt {
            path,
            message: err.to_string(),
        })
    }

    /// Persist a freshly fetched result. Called once per unit, before merging.
    pub fn store(&self, unit: &WorkUnit, result: &FetchResult) -> Result<PathBuf, CacheError> {
        let content = serde_json::to_vec(result).map_err(|err| CacheError::Encode {
            unit: unit.to_string(),
            message: err.to_string(),
        })?;
        let filename = checkpoint_filename(&unit.query, unit.label());
        let path = self.writer.write_bytes(&filename, &content)?;
        engine_debug!("checkpoint stored for {unit} at {:?}", path);
        Ok(path)
    }

    /// Fetch a unit that has no checkpoint and store the result before returning it.
    pub async fn fetch_and_store(
        &self,
        unit: &WorkUnit,
        client: &dyn SearchClient,
    ) -> Result<FetchResult, CacheError> {
        let result = client.fetch(unit).await;
        self.store(unit, &result)?;
        Ok(result)
    }
}
