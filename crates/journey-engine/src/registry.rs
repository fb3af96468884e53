//! Single-writer store for timers, alarm snapshots, token monitors and the
//! monitoring gate
//!
//! The registry owns no business logic. Every operation takes the one lock,
//! performs a small compare-and-swap style mutation and releases it; callers
//! never hold the guard across an `.await`.

use crate::timer::TimerHandle;
use chrono::{DateTime, Utc};
use journey_live_core::{ActivityId, AlarmSnapshot};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct RegistryState {
    monitoring_started: bool,
    timers: HashMap<ActivityId, TimerHandle>,
    alarm_snapshots: HashMap<ActivityId, AlarmSnapshot>,
    token_monitors: HashSet<ActivityId>,
}

/// Shared engine state, safe to use from any task.
#[derive(Debug, Default)]
pub struct StateRegistry {
    state: Mutex<RegistryState>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` exactly once for the lifetime of the registry.
    pub fn start_monitoring_if_needed(&self) -> bool {
        let mut state = self.lock();
        if state.monitoring_started {
            return false;
        }
        state.monitoring_started = true;
        true
    }

    pub fn is_monitoring_started(&self) -> bool {
        self.lock().monitoring_started
    }

    /// Install `handle` for `id`, returning the displaced handle.
    ///
    /// The caller is responsible for canceling the returned handle.
    pub fn store_timer(&self, id: &ActivityId, handle: TimerHandle) -> Option<TimerHandle> {
        self.lock().timers.insert(id.clone(), handle)
    }

    pub fn remove_timer(&self, id: &ActivityId) -> Option<TimerHandle> {
        self.lock().timers.remove(id)
    }

    /// Remove the timer for `id` only if it is still the one with `generation`.
    pub fn remove_timer_if_current(&self, id: &ActivityId, generation: u64) -> bool {
        let mut state = self.lock();
        match state.timers.get(id) {
            Some(handle) if handle.generation() == generation => {
                state.timers.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Claim the push-token monitor slot for `id`.
    ///
    /// Returns `false` if a monitor for `id` is already running.
    pub fn claim_token_monitor(&self, id: &ActivityId) -> bool {
        self.lock().token_monitors.insert(id.clone())
    }

    pub fn release_token_monitor(&self, id: &ActivityId) {
        self.lock().token_monitors.remove(id);
    }

    pub fn has_token_monitor(&self, id: &ActivityId) -> bool {
        self.lock().token_monitors.contains(id)
    }

    pub fn drain_timers(&self) -> Vec<TimerHandle> {
        self.lock().timers.drain().map(|(_, handle)| handle).collect()
    }

    /// Decide whether an alarm for `id` has to be (re)scheduled.
    ///
    /// - `enabled == false` clears the stored snapshot and returns `false`.
    /// - `force` stores the candidate and returns `true`.
    /// - Otherwise the candidate is stored and `true` returned only when it
    ///   differs from the previous snapshot.
    pub fn should_schedule_alarm(
        &self,
        id: &ActivityId,
        arrival_time: DateTime<Utc>,
        offset_minutes: u32,
        enabled: bool,
        force: bool,
    ) -> bool {
        let mut state = self.lock();
        if !enabled {
            state.alarm_snapshots.remove(id);
            return false;
        }

        let candidate = AlarmSnapshot {
            arrival_time,
            offset_minutes,
            enabled,
        };
        let previous = state.alarm_snapshots.insert(id.clone(), candidate);
        force || previous != Some(candidate)
    }

    pub fn clear_alarm_snapshot(&self, id: &ActivityId) -> Option<AlarmSnapshot> {
        self.lock().alarm_snapshots.remove(id)
    }

    /// Drop everything held for `id`; returns the timer so the caller can cancel it.
    pub fn release_activity(&self, id: &ActivityId) -> Option<TimerHandle> {
        let mut state = self.lock();
        state.alarm_snapshots.remove(id);
        state.token_monitors.remove(id);
        state.timers.remove(id)
    }

    pub fn alarm_snapshot(&self, id: &ActivityId) -> Option<AlarmSnapshot> {
        self.lock().alarm_snapshots.get(id).copied()
    }

    #[cfg(test)]
    pub(crate) fn timer(&self, id: &ActivityId) -> Option<TimerHandle> {
        self.lock().timers.get(id).cloned()
    }

    pub fn has_timer(&self, id: &ActivityId) -> bool {
        self.lock().timers.contains_key(id)
    }

    pub fn timer_count(&self) -> usize {
        self.lock().timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn arrival() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 10, 0).unwrap()
    }

    fn handle() -> TimerHandle {
        TimerHandle::new(CancellationToken::new())
    }

    #[test]
    fn test_monitoring_gate_opens_once() {
        let registry = StateRegistry::new();
        assert!(!registry.is_monitoring_started());
        assert!(registry.start_monitoring_if_needed());
        assert!(!registry.start_monitoring_if_needed());
        assert!(registry.is_monitoring_started());
    }

    #[test]
    fn test_monitoring_gate_single_winner_across_threads() {
        let registry = Arc::new(StateRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.start_monitoring_if_needed())
            })
            .collect();

        let winners = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_identical_request_is_deduplicated() {
        let registry = StateRegistry::new();
        let id = ActivityId::from("a1");

        assert!(registry.should_schedule_alarm(&id, arrival(), 10, true, false));
        assert!(!registry.should_schedule_alarm(&id, arrival(), 10, true, false));
        assert_eq!(
            registry.alarm_snapshot(&id),
            Some(AlarmSnapshot {
                arrival_time: arrival(),
                offset_minutes: 10,
                enabled: true,
            })
        );
    }

    #[test]
    fn test_changed_offset_or_arrival_schedules_again() {
        let registry = StateRegistry::new();
        let id = ActivityId::from("a1");

        assert!(registry.should_schedule_alarm(&id, arrival(), 10, true, false));
        assert!(registry.should_schedule_alarm(&id, arrival(), 15, true, false));
        let later = arrival() + chrono::Duration::minutes(3);
        assert!(registry.should_schedule_alarm(&id, later, 15, true, false));
        assert!(!registry.should_schedule_alarm(&id, later, 15, true, false));
    }

    #[test]
    fn test_force_bypasses_dedup() {
        let registry = StateRegistry::new();
        let id = ActivityId::from("a1");

        assert!(registry.should_schedule_alarm(&id, arrival(), 10, true, false));
        assert!(registry.should_schedule_alarm(&id, arrival(), 10, true, true));
    }

    #[test]
    fn test_disabled_clears_snapshot() {
        let registry = StateRegistry::new();
        let id = ActivityId::from("a1");

        assert!(registry.should_schedule_alarm(&id, arrival(), 10, true, false));
        assert!(!registry.should_schedule_alarm(&id, arrival(), 10, false, false));
        assert_eq!(registry.alarm_snapshot(&id), None);

        // Even a forced request is refused while disabled
        assert!(!registry.should_schedule_alarm(&id, arrival(), 10, false, true));
        assert_eq!(registry.alarm_snapshot(&id), None);

        // Re-enabling schedules again because the snapshot is gone
        assert!(registry.should_schedule_alarm(&id, arrival(), 10, true, false));
    }

    #[test]
    fn test_store_timer_returns_displaced_handle() {
        let registry = StateRegistry::new();
        let id = ActivityId::from("a1");
        let first = handle();
        let first_generation = first.generation();

        assert!(registry.store_timer(&id, first).is_none());
        let displaced = registry.store_timer(&id, handle()).unwrap();
        assert_eq!(displaced.generation(), first_generation);
        assert_eq!(registry.timer_count(), 1);
    }

    #[test]
    fn test_remove_timer_if_current_ignores_stale_generation() {
        let registry = StateRegistry::new();
        let id = ActivityId::from("a1");
        let first = handle();
        let stale_generation = first.generation();
        registry.store_timer(&id, first);
        let second = handle();
        let current_generation = second.generation();
        registry.store_timer(&id, second);

        assert!(!registry.remove_timer_if_current(&id, stale_generation));
        assert!(registry.has_timer(&id));
        assert!(registry.remove_timer_if_current(&id, current_generation));
        assert!(!registry.has_timer(&id));
    }

    #[test]
    fn test_drain_empties_all_timers() {
        let registry = StateRegistry::new();
        registry.store_timer(&ActivityId::from("a1"), handle());
        registry.store_timer(&ActivityId::from("a2"), handle());

        assert_eq!(registry.drain_timers().len(), 2);
        assert_eq!(registry.timer_count(), 0);
        assert!(registry.drain_timers().is_empty());
    }

    #[test]
    fn test_token_monitor_claimed_once_until_released() {
        let registry = StateRegistry::new();
        let id = ActivityId::from("a1");

        assert!(registry.claim_token_monitor(&id));
        assert!(!registry.claim_token_monitor(&id));
        assert!(registry.has_token_monitor(&id));

        registry.release_activity(&id);
        assert!(!registry.has_token_monitor(&id));
        assert!(registry.claim_token_monitor(&id));
        registry.release_token_monitor(&id);
        assert!(!registry.has_token_monitor(&id));
    }

    #[test]
    fn test_double_release_is_noop() {
        let registry = StateRegistry::new();
        let id = ActivityId::from("a1");
        registry.store_timer(&id, handle());
        registry.should_schedule_alarm(&id, arrival(), 10, true, false);

        assert!(registry.release_activity(&id).is_some());
        assert!(registry.release_activity(&id).is_none());
        assert!(registry.remove_timer(&id).is_none());
        assert!(registry.clear_alarm_snapshot(&id).is_none());
        assert_eq!(registry.alarm_snapshot(&id), None);
    }
}
