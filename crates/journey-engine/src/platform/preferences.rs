/// User alarm preferences.
///
/// Setters record an `alarm_preference_changed` analytics event when the value
/// actually changes.
pub trait PreferenceStore: Send + Sync {
    fn alarm_enabled(&self) -> bool;

    fn alarm_offset_minutes(&self) -> u32;

    fn set_alarm_enabled(&self, enabled: bool);

    fn set_alarm_offset_minutes(&self, minutes: u32);
}
