//! JSON-file journey cache

use crate::error::EngineError;
use crate::platform::JourneyCache;
use journey_live_core::{JourneyData, Train};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected_train: Option<Train>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    journey_data: Option<JourneyData>,
}

/// Journey cache persisted as one JSON document.
///
/// A missing file reads as an empty cache. Writes go to a sibling temp file
/// that is renamed over the target, so readers never see a partial document.
#[derive(Debug)]
pub struct FileJourneyCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileJourneyCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<CacheDocument, EngineError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CacheDocument::default()),
            Err(e) => {
                return Err(EngineError::cache(
                    format!("failed to read {}", self.path.display()),
                    Some(Box::new(e)),
                ));
            }
        };
        if content.trim().is_empty() {
            return Ok(CacheDocument::default());
        }
        serde_json::from_str(&content).map_err(|e| {
            EngineError::cache(
                format!("failed to parse {}", self.path.display()),
                Some(Box::new(e)),
            )
        })
    }

    fn write(&self, document: &CacheDocument) -> Result<(), EngineError> {
        let io_error = |e: io::Error| {
            EngineError::cache(
                format!("failed to write {}", self.path.display()),
                Some(Box::new(e)),
            )
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| EngineError::cache("failed to serialize journey cache", Some(Box::new(e))))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_error)?;
        fs::rename(&tmp_path, &self.path).map_err(io_error)
    }

    fn modify(&self, apply: impl FnOnce(&mut CacheDocument)) -> Result<(), EngineError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut document = self.read()?;
        apply(&mut document);
        self.write(&document)
    }
}

impl JourneyCache for FileJourneyCache {
    fn load_selected_train(&self) -> Result<Option<Train>, EngineError> {
        Ok(self.read()?.selected_train)
    }

    fn load_journey_data(&self) -> Result<Option<JourneyData>, EngineError> {
        Ok(self.read()?.journey_data)
    }

    fn store_selected_train(&self, train: &Train) -> Result<(), EngineError> {
        self.modify(|doc| doc.selected_train = Some(train.clone()))
    }

    fn store_journey_data(&self, data: &JourneyData) -> Result<(), EngineError> {
        self.modify(|doc| doc.journey_data = Some(data.clone()))
    }

    fn clear(&self) -> Result<(), EngineError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::cache(
                format!("failed to remove {}", self.path.display()),
                Some(Box::new(e)),
            )),
        }
    }
}
