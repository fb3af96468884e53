use super::lock;
use crate::error::EngineError;
use crate::platform::JourneyCache;
use journey_live_core::{JourneyData, Train};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CacheState {
    train: Option<Train>,
    journey: Option<JourneyData>,
    load_error: Option<String>,
}

/// Journey cache held in memory.
#[derive(Clone, Default)]
pub struct MemoryJourneyCache {
    state: Arc<Mutex<CacheState>>,
}

impl MemoryJourneyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journey(train: Train, journey: JourneyData) -> Self {
        let cache = Self::new();
        {
            let mut state = lock(&cache.state);
            state.train = Some(train);
            state.journey = Some(journey);
        }
        cache
    }

    /// Make every load fail with `message`, as a corrupt cache would.
    pub fn fail_loads(&self, message: impl Into<String>) {
        lock(&self.state).load_error = Some(message.into());
    }

    fn check_load(&self) -> Result<(), EngineError> {
        match &lock(&self.state).load_error {
            Some(message) => Err(EngineError::cache(message.clone(), None)),
            None => Ok(()),
        }
    }
}

impl JourneyCache for MemoryJourneyCache {
    fn load_selected_train(&self) -> Result<Option<Train>, EngineError> {
        self.check_load()?;
        Ok(lock(&self.state).train.clone())
    }

    fn load_journey_data(&self) -> Result<Option<JourneyData>, EngineError> {
        self.check_load()?;
        Ok(lock(&self.state).journey.clone())
    }

    fn store_selected_train(&self, train: &Train) -> Result<(), EngineError> {
        lock(&self.state).train = Some(train.clone());
        Ok(())
    }

    fn store_journey_data(&self, data: &JourneyData) -> Result<(), EngineError> {
        lock(&self.state).journey = Some(data.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), EngineError> {
        let mut state = lock(&self.state);
        state.train = None;
        state.journey = None;
        Ok(())
    }
}
