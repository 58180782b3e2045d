//! Weather ingestion: threshold alerts for a user's latest conditions

use chrono::Duration;
use serde::Serialize;
use sqlx::PgPool;

use shared::{evaluate_alerts, AlertEvent, AlertThresholds, ServerEvent, UserId, WeatherSnapshot};

use crate::error::AppResult;
use crate::realtime::RoomHub;
use crate::services::NotificationService;

/// Weather service for evaluating and delivering alerts
#[derive(Clone)]
pub struct WeatherService {
    notifications: NotificationService,
    hub: RoomHub,
    thresholds: AlertThresholds,
    dedup_window: Duration,
}

/// Result of ingesting one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub alerts: Vec<AlertEvent>,
    /// Sockets in the user's room that received the snapshot
    pub delivered: usize,
}

impl WeatherService {
    pub fn new(
        db: PgPool,
        hub: RoomHub,
        thresholds: AlertThresholds,
        dedup_window: Duration,
    ) -> Self {
        Self {
            notifications: NotificationService::new(db),
            hub,
            thresholds,
            dedup_window,
        }
    }

    /// Evaluate a snapshot, persist its alerts and push both to the user
    ///
    /// Alerts are stored before anything is pushed, so a client that syncs
    /// after receiving them finds the records. An alert whose message is still
    /// unread from within the dedup window is not stored again.
    pub async fn ingest_snapshot(
        &self,
        user_id: UserId,
        snapshot: WeatherSnapshot,
    ) -> AppResult<IngestOutcome> {
        let alerts = evaluate_alerts(&snapshot, &self.thresholds);

        if !alerts.is_empty() {
            let messages: Vec<String> = alerts.iter().map(|a| a.message.clone()).collect();
            let stored = self
                .notifications
                .create_many_unless_recent(user_id, &messages, self.dedup_window)
                .await?;
            if stored.len() < messages.len() {
                tracing::debug!(
                    user_id = %user_id,
                    skipped = messages.len() - stored.len(),
                    "Skipped storing repeated alerts"
                );
            }
        }

        let delivered = self
            .hub
            .publish(user_id, ServerEvent::WeatherSnapshot(snapshot));
        if !alerts.is_empty() {
            tracing::info!(user_id = %user_id, count = alerts.len(), "Weather alerts raised");
            self.hub
                .publish(user_id, ServerEvent::WeatherAlert(alerts.clone()));
        }

        Ok(IngestOutcome { alerts, delivered })
    }
}
