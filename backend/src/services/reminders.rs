//! Care reminder sweeper
//!
//! Runs in the background at a fixed interval. Each sweep rolls finished
//! watering cycles forward and delivers the day's care reminders, storing a
//! notification for every reminder it pushes.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use shared::{CareReminder, ServerEvent, UserId};

use crate::error::AppResult;
use crate::realtime::RoomHub;
use crate::services::{NotificationService, ScheduleService};

/// What one sweep did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub rolled_users: usize,
    pub reminders: usize,
}

#[derive(Clone)]
pub struct ReminderSweeper {
    schedules: ScheduleService,
    notifications: NotificationService,
    hub: RoomHub,
    interval: Duration,
}

impl ReminderSweeper {
    pub fn new(db: PgPool, hub: RoomHub, interval: Duration) -> Self {
        Self {
            schedules: ScheduleService::new(db.clone()),
            notifications: NotificationService::new(db),
            hub,
            interval,
        }
    }

    /// Start sweeping in the background
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let today = Local::now().date_naive();
                match self.sweep(today).await {
                    Ok(report) if report != SweepReport::default() => {
                        tracing::info!(
                            rolled_users = report.rolled_users,
                            reminders = report.reminders,
                            "Reminder sweep finished"
                        );
                    }
                    Ok(_) => tracing::debug!("Reminder sweep found nothing to do"),
                    Err(e) => tracing::warn!(error = %e, "Reminder sweep failed"),
                }
            }
        })
    }

    /// Run one sweep for `today`
    pub async fn sweep(&self, today: NaiveDate) -> AppResult<SweepReport> {
        let rolled = self.schedules.roll_forward_all(today).await?;
        for (user_id, crop_names) in &rolled {
            self.hub.publish(
                *user_id,
                ServerEvent::ScheduleChanged {
                    crop_names: crop_names.clone(),
                },
            );
        }

        let claimed = self.schedules.claim_due_reminders(today).await?;
        for (user_id, reminder) in &claimed {
            if let Err(e) = self.deliver(*user_id, reminder.clone()).await {
                tracing::warn!(user_id = %user_id, crop_name = %reminder.crop_name, error = %e, "Failed to deliver reminder");
            }
        }

        Ok(SweepReport {
            rolled_users: rolled.len(),
            reminders: claimed.len(),
        })
    }

    async fn deliver(&self, user_id: UserId, reminder: CareReminder) -> AppResult<()> {
        self.notifications.create(user_id, &reminder.message).await?;
        let listeners = self.hub.publish(user_id, ServerEvent::CareReminder(reminder));
        tracing::debug!(user_id = %user_id, listeners, "Delivered care reminder");
        Ok(())
    }
}
