//! Notification service for the persisted per-user notification log

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};

use shared::{NotificationId, NotificationRecord, UserId};

use crate::error::AppResult;

/// Notification service for managing notifications
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

#[derive(Debug, Clone, FromRow)]
struct NotificationRow {
    id: i64,
    message: String,
    created_at: DateTime<Utc>,
    is_read: bool,
}

impl From<NotificationRow> for NotificationRecord {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: NotificationId(row.id),
            message: row.message,
            timestamp: row.created_at,
            read: row.is_read,
        }
    }
}

impl NotificationService {
    /// Create a new notification service
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// A user's notifications, newest first
    pub async fn list(&self, user_id: UserId, unread_only: bool) -> AppResult<Vec<NotificationRecord>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, message, created_at, is_read
            FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.0)
        .bind(unread_only)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(NotificationRecord::from).collect())
    }

    /// Store one unread notification
    pub async fn create(&self, user_id: UserId, message: &str) -> AppResult<NotificationRecord> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (user_id, message)
            VALUES ($1, $2)
            RETURNING id, message, created_at, is_read
            "#,
        )
        .bind(user_id.0)
        .bind(message)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Store the messages that have no unread copy newer than `window`
    ///
    /// Returns only the records actually inserted.
    pub async fn create_many_unless_recent(
        &self,
        user_id: UserId,
        messages: &[String],
        window: Duration,
    ) -> AppResult<Vec<NotificationRecord>> {
        let since = Utc::now() - window;
        let mut tx = self.db.begin().await?;
        let mut records = Vec::with_capacity(messages.len());

        for message in messages {
            let row = sqlx::query_as::<_, NotificationRow>(
                r#"
                INSERT INTO notifications (user_id, message)
                SELECT $1, $2
                WHERE NOT EXISTS (
                    SELECT 1 FROM notifications
                    WHERE user_id = $1 AND message = $2
                      AND is_read = FALSE AND created_at >= $3
                )
                RETURNING id, message, created_at, is_read
                "#,
            )
            .bind(user_id.0)
            .bind(message)
            .bind(since)
            .fetch_optional(&mut *tx)
            .await?;
            records.extend(row.map(NotificationRecord::from));
        }

        tx.commit().await?;
        Ok(records)
    }

    /// Mark every unread notification read; returns how many changed
    pub async fn mark_all_read(&self, user_id: UserId) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id.0)
        .execute(&self.db)
        .await?;

        tracing::debug!(user_id = %user_id, marked = result.rows_affected(), "Marked notifications read");
        Ok(result.rows_affected())
    }

    /// Delete every notification of the user; returns how many were removed
    pub async fn clear_all(&self, user_id: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id.0)
            .execute(&self.db)
            .await?;

        tracing::debug!(user_id = %user_id, cleared = result.rows_affected(), "Cleared notifications");
        Ok(result.rows_affected())
    }
}
