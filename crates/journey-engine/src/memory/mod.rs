//! In-process collaborators for tests and the simulator
//!
//! Each type records the calls it receives in a call log and exposes drivers
//! (token rotation, alarm firing, scripted failures) so scenarios can be
//! played without a host platform.

mod activity;
mod alarm;
mod analytics;
mod cache;
mod preferences;
mod push;
mod remote;

pub use activity::{ActivityCall, MemoryActivityPlatform};
pub use alarm::{AlarmCall, MemoryAlarmPlatform};
pub use analytics::{AnalyticsEvent, RecordingAnalytics};
pub use cache::MemoryJourneyCache;
pub use preferences::MemoryPreferences;
pub use push::StaticPushSupplier;
pub use remote::{MemoryCoordinationClient, RemoteCall};

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Turn a channel receiver into a stream that ends once every sender is gone.
fn receiver_stream<T: Send + 'static>(rx: mpsc::UnboundedReceiver<T>) -> BoxStream<'static, T> {
    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed()
}

/// Send `item` to every live subscriber, dropping the closed ones.
fn broadcast<T: Clone>(subscribers: &mut Vec<mpsc::UnboundedSender<T>>, item: &T) {
    subscribers.retain(|tx| tx.send(item.clone()).is_ok());
}
