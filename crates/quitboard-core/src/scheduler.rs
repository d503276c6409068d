//! Recurring trigger driving the scheduled cycles.
//!
//! One trigger source fires two logically independent jobs per firing:
//! the leaderboard recompute-and-publish, and the notification fan-out.
//! The fan-out runs on its own task so neither job blocks the other. A
//! firing is never cancelled mid-flight; per-member failures inside a
//! firing are skipped and naturally retried by the next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::engine::Engine;
use crate::transport::ChatTransport;

/// When the recomputation cycle fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fixed time of day, UTC.
    Daily { hour: u32, minute: u32 },
    /// Fixed interval; the accelerated-testing mode.
    Every(Duration),
}

impl Trigger {
    /// Next firing instant strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Trigger::Daily { hour, minute } => {
                let today = after
                    .date_naive()
                    .and_hms_opt(hour, minute, 0)
                    .unwrap_or_else(|| after.date_naive().and_hms_opt(0, 0, 0).expect("midnight"))
                    .and_utc();
                if today > after {
                    today
                } else {
                    today + chrono::Duration::days(1)
                }
            }
            Trigger::Every(interval) => {
                after
                    + chrono::Duration::from_std(interval)
                        .unwrap_or_else(|_| chrono::Duration::days(1))
            }
        }
    }
}

/// Drive the engine on the given trigger until the task is dropped.
pub async fn run<T: ChatTransport + 'static>(engine: Arc<Engine<T>>, trigger: Trigger) {
    loop {
        let now = Utc::now();
        let fire_at = trigger.next_fire(now);
        let wait = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
        info!(at = %fire_at, "next scheduled firing");
        tokio::time::sleep(wait).await;

        // Job (b) must not block or be blocked by job (a).
        let notifier = Arc::clone(&engine);
        let fan_out = tokio::spawn(async move {
            if let Err(err) = notifier.run_notification_cycle().await {
                error!(%err, "notification cycle failed");
            }
        });

        if let Err(err) = engine.run_leaderboard_cycle().await {
            error!(%err, "leaderboard cycle failed");
        }
        if let Err(err) = fan_out.await {
            error!(%err, "notification task aborted");
        }
    }
}
