//! Persisted journey selection used for recovery after a restart

use crate::error::EngineError;
use journey_live_core::{JourneyData, Train};

/// Key-value store holding the last selected train and its journey data.
///
/// Loads return `Ok(None)` when nothing was stored yet.
pub trait JourneyCache: Send + Sync {
    fn load_selected_train(&self) -> Result<Option<Train>, EngineError>;

    fn load_journey_data(&self) -> Result<Option<JourneyData>, EngineError>;

    fn store_selected_train(&self, train: &Train) -> Result<(), EngineError>;

    fn store_journey_data(&self, data: &JourneyData) -> Result<(), EngineError>;

    fn clear(&self) -> Result<(), EngineError>;
}
