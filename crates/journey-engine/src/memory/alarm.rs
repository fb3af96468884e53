use super::{broadcast, lock, receiver_stream};
use crate::error::EngineError;
use crate::platform::{AlarmPlatform, AlarmStream};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use journey_live_core::schema::alarm_time;
use journey_live_core::{
    ActivityId, AlarmCancelReason, AlarmId, AlarmMetadata, AlarmState, AlarmStatus,
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Record of alarm platform calls for test assertions
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmCall {
    Schedule {
        activity_id: ActivityId,
        arrival_time: DateTime<Utc>,
        offset_minutes: u32,
    },
    Cancel {
        activity_id: ActivityId,
        reason: AlarmCancelReason,
        was_triggered: bool,
    },
    CancelAll {
        reason: AlarmCancelReason,
    },
}

#[derive(Debug, Clone)]
struct ScheduledAlarm {
    id: AlarmId,
    activity_id: ActivityId,
    alarm_time: DateTime<Utc>,
    state: AlarmState,
}

#[derive(Default)]
struct AlarmPlatformState {
    alarms: Vec<ScheduledAlarm>,
    failures_remaining: u32,
    subscribers: Vec<mpsc::UnboundedSender<Vec<AlarmStatus>>>,
    call_log: Vec<AlarmCall>,
}

impl AlarmPlatformState {
    fn publish(&mut self) {
        let snapshot: Vec<AlarmStatus> = self
            .alarms
            .iter()
            .map(|a| AlarmStatus {
                id: a.id.clone(),
                state: a.state,
            })
            .collect();
        broadcast(&mut self.subscribers, &snapshot);
    }
}

/// Alarm platform that never rings on its own; drive it with [`fire`] or
/// [`fire_due`].
///
/// [`fire`]: MemoryAlarmPlatform::fire
/// [`fire_due`]: MemoryAlarmPlatform::fire_due
#[derive(Clone, Default)]
pub struct MemoryAlarmPlatform {
    state: Arc<Mutex<AlarmPlatformState>>,
}

impl MemoryAlarmPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` schedule calls fail.
    pub fn fail_next_schedules(&self, count: u32) {
        lock(&self.state).failures_remaining = count;
    }

    /// Ring the alarm of `activity_id` now.
    pub fn fire(&self, activity_id: &ActivityId) -> Option<AlarmId> {
        let mut state = lock(&self.state);
        let alarm = state
            .alarms
            .iter_mut()
            .find(|a| &a.activity_id == activity_id)?;
        alarm.state = AlarmState::Alerting;
        let id = alarm.id.clone();
        state.publish();
        Some(id)
    }

    /// Ring every scheduled alarm whose time has come.
    pub fn fire_due(&self, now: DateTime<Utc>) -> Vec<ActivityId> {
        let mut state = lock(&self.state);
        let mut fired = Vec::new();
        for alarm in state.alarms.iter_mut() {
            if alarm.state == AlarmState::Scheduled && alarm.alarm_time <= now {
                alarm.state = AlarmState::Alerting;
                fired.push(alarm.activity_id.clone());
            }
        }
        if !fired.is_empty() {
            state.publish();
        }
        fired
    }

    pub fn alarm_for(&self, activity_id: &ActivityId) -> Option<AlarmId> {
        lock(&self.state)
            .alarms
            .iter()
            .find(|a| &a.activity_id == activity_id)
            .map(|a| a.id.clone())
    }

    pub fn alarm_time_for(&self, activity_id: &ActivityId) -> Option<DateTime<Utc>> {
        lock(&self.state)
            .alarms
            .iter()
            .find(|a| &a.activity_id == activity_id)
            .map(|a| a.alarm_time)
    }

    pub fn scheduled_count(&self) -> usize {
        lock(&self.state).alarms.len()
    }

    pub fn schedule_calls(&self) -> usize {
        lock(&self.state)
            .call_log
            .iter()
            .filter(|c| matches!(c, AlarmCall::Schedule { .. }))
            .count()
    }

    pub fn cancel_calls(&self) -> usize {
        lock(&self.state)
            .call_log
            .iter()
            .filter(|c| matches!(c, AlarmCall::Cancel { .. }))
            .count()
    }

    /// Get a copy of the call log for assertions
    pub fn get_calls(&self) -> Vec<AlarmCall> {
        lock(&self.state).call_log.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).call_log.clear();
    }
}

#[async_trait]
impl AlarmPlatform for MemoryAlarmPlatform {
    async fn schedule_arrival_alarm(
        &self,
        activity_id: &ActivityId,
        arrival_time: DateTime<Utc>,
        offset_minutes: u32,
        _metadata: &AlarmMetadata,
    ) -> Result<AlarmId, EngineError> {
        let mut state = lock(&self.state);
        state.call_log.push(AlarmCall::Schedule {
            activity_id: activity_id.clone(),
            arrival_time,
            offset_minutes,
        });
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(EngineError::platform("alarm authorization denied"));
        }

        let id = AlarmId::new(uuid::Uuid::new_v4().to_string());
        state.alarms.retain(|a| &a.activity_id != activity_id);
        state.alarms.push(ScheduledAlarm {
            id: id.clone(),
            activity_id: activity_id.clone(),
            alarm_time: alarm_time(arrival_time, offset_minutes),
            state: AlarmState::Scheduled,
        });
        state.publish();
        Ok(id)
    }

    async fn cancel_arrival_alarm(
        &self,
        activity_id: &ActivityId,
        reason: AlarmCancelReason,
        was_triggered: bool,
    ) {
        let mut state = lock(&self.state);
        state.call_log.push(AlarmCall::Cancel {
            activity_id: activity_id.clone(),
            reason,
            was_triggered,
        });
        let before = state.alarms.len();
        state.alarms.retain(|a| &a.activity_id != activity_id);
        if state.alarms.len() != before {
            state.publish();
        }
    }

    async fn cancel_all_alarms(&self, reason: AlarmCancelReason) {
        let mut state = lock(&self.state);
        state.call_log.push(AlarmCall::CancelAll { reason });
        if !state.alarms.is_empty() {
            state.alarms.clear();
            state.publish();
        }
    }

    async fn has_scheduled_alarm(&self, activity_id: &ActivityId) -> bool {
        lock(&self.state)
            .alarms
            .iter()
            .any(|a| &a.activity_id == activity_id)
    }

    async fn activity_id(&self, alarm_id: &AlarmId) -> Option<ActivityId> {
        lock(&self.state)
            .alarms
            .iter()
            .find(|a| &a.id == alarm_id)
            .map(|a| a.activity_id.clone())
    }

    fn alarm_updates(&self) -> AlarmStream {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.state).subscribers.push(tx);
        receiver_stream(rx)
    }
}
