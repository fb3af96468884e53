//! Cached journey records read back for activity recovery

use super::station::JourneyStation;
use serde::{Deserialize, Serialize};

/// The train the user last selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    /// Display name (e.g., "Tze-Chiang 152")
    pub name: String,
    /// Operator train number
    pub number: String,
}

/// Timetable of the selected train with the user's chosen boarding and
/// alighting stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyData {
    /// Ordered stops of the train
    pub stations: Vec<JourneyStation>,
    /// Code of the station the user boards at
    pub departure_code: String,
    /// Code of the station the user gets off at
    pub arrival_code: String,
}

impl JourneyData {
    pub fn departure_station(&self) -> Option<&JourneyStation> {
        self.station(&self.departure_code)
    }

    pub fn arrival_station(&self) -> Option<&JourneyStation> {
        self.station(&self.arrival_code)
    }

    fn station(&self, code: &str) -> Option<&JourneyStation> {
        self.stations.iter().find(|s| s.code == code)
    }
}
