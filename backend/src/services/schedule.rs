//! Schedule service for per-user crop care schedules
//!
//! Supports:
//! - Creating a schedule from the crop's care profile
//! - Watering updates with an explicit target state
//! - Lazy rollover of finished watering cycles on every read
//! - Claiming the day's care reminders for the sweeper

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use validator::Validate;

use shared::{
    is_fertilization_due, next_due_date, roll_forward, validate_crop_name, validate_frequency,
    CareReminder, CropScheduleRecord, ScheduleError, UserId,
};

use crate::error::{AppError, AppResult};
use crate::services::NotificationService;

/// Schedule service for managing watering schedules
#[derive(Clone)]
pub struct ScheduleService {
    db: PgPool,
}

/// Stored schedule row
///
/// `previous_last_watered` holds the watering date replaced by the latest
/// mark, so that an undo on the same cycle can restore it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ScheduleRow {
    pub id: i64,
    pub user_id: i64,
    pub crop_name: String,
    pub last_watered: Option<NaiveDate>,
    pub previous_last_watered: Option<NaiveDate>,
    pub growing_time_days: i32,
    pub watering_frequency_days: i32,
    pub fertilization_frequency_days: i32,
    pub next_watering: NaiveDate,
    pub watered: bool,
    pub reminded_on: Option<NaiveDate>,
}

/// A rolled copy of a row together with the state it was rolled from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollover {
    pub before: ScheduleRow,
    pub rolled: ScheduleRow,
}

impl Rollover {
    /// Whether `current` still has the watering state this rollover was computed from
    pub fn still_applies(&self, current: &ScheduleRow) -> bool {
        current.id == self.before.id
            && current.watered == self.before.watered
            && current.last_watered == self.before.last_watered
            && current.previous_last_watered == self.before.previous_last_watered
            && current.next_watering == self.before.next_watering
    }
}

/// What happened when a rollover was written back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloverOutcome {
    Applied(ScheduleRow),
    /// The row changed after it was read; the stored row is kept
    Superseded(ScheduleRow),
    Gone,
}

/// How a stored row is settled before it is returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    Current(ScheduleRow),
    Roll(Rollover),
}

/// Plan rollovers for rows read on `today`
///
/// Rows whose stored frequencies cannot be scheduled are logged and left out.
pub fn plan_rollovers(rows: Vec<ScheduleRow>, today: NaiveDate) -> Vec<Settle> {
    rows.into_iter()
        .map(|row| {
            let record = row.to_record();
            let planned = validate_frequency(record.watering_frequency_days)
                .and(validate_frequency(record.fertilization_frequency_days))
                .map_err(|msg| msg.to_string())
                .and_then(|()| row.rollover(today).map_err(|e| e.to_string()));
            (row, planned)
        })
        .filter_map(|(row, planned)| match planned {
            Ok(Some(rollover)) => Some(Settle::Roll(rollover)),
            Ok(None) => Some(Settle::Current(row)),
            Err(e) => {
                tracing::warn!(
                    user_id = row.user_id,
                    crop_name = %row.crop_name,
                    error = %e,
                    "Skipping unschedulable schedule row"
                );
                None
            }
        })
        .collect()
}

/// Care profile row from the reference table
#[derive(Debug, Clone, FromRow)]
struct CareProfileRow {
    growing_time_days: i32,
    watering_frequency_days: i32,
    fertilization_frequency_days: i32,
}

/// Input for creating a schedule
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleInput {
    pub user_id: UserId,
    #[validate(length(min = 1, max = 100, message = "Crop name must be 1 to 100 characters"))]
    pub crop_name: String,
}

/// Input for a watering update
#[derive(Debug, Deserialize)]
pub struct WateringInput {
    pub watered: bool,
}

const SCHEDULE_COLUMNS: &str = r#"
    id, user_id, crop_name, last_watered, previous_last_watered,
    growing_time_days, watering_frequency_days, fertilization_frequency_days,
    next_watering, watered, reminded_on
"#;

fn days(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl ScheduleRow {
    pub fn to_record(&self) -> CropScheduleRecord {
        CropScheduleRecord {
            crop_name: self.crop_name.clone(),
            last_watered: self.last_watered,
            growing_time_days: days(self.growing_time_days),
            watering_frequency_days: days(self.watering_frequency_days),
            fertilization_frequency_days: days(self.fertilization_frequency_days),
            next_watering: self.next_watering,
            watered: self.watered,
        }
    }

    /// Move a finished watered cycle forward. Returns whether the row changed.
    pub fn roll_forward(&mut self, today: NaiveDate) -> Result<bool, ScheduleError> {
        let mut record = self.to_record();
        if !roll_forward(&mut record, today)? {
            return Ok(false);
        }
        self.last_watered = record.last_watered;
        self.next_watering = record.next_watering;
        self.watered = record.watered;
        self.previous_last_watered = None;
        Ok(true)
    }

    /// Plan a rollover without touching this row
    pub fn rollover(&self, today: NaiveDate) -> Result<Option<Rollover>, ScheduleError> {
        let mut rolled = self.clone();
        if !rolled.roll_forward(today)? {
            return Ok(None);
        }
        Ok(Some(Rollover {
            before: self.clone(),
            rolled,
        }))
    }

    /// Set the watered flag to `target`
    ///
    /// Marking records today as the last watering and keeps the replaced
    /// date; unmarking restores it. `next_watering` is never touched. Returns
    /// false when the row already had the target state.
    pub fn apply_watering(&mut self, target: bool, today: NaiveDate) -> bool {
        if self.watered == target {
            return false;
        }
        if target {
            self.previous_last_watered = self.last_watered;
            self.last_watered = Some(today);
        } else {
            self.last_watered = self.previous_last_watered.take();
        }
        self.watered = target;
        true
    }

    /// Confirmation stored when the row is marked watered on `today`
    pub fn watering_confirmation(&self, today: NaiveDate) -> Result<String, ScheduleError> {
        let next = next_due_date(Some(today), days(self.watering_frequency_days), today)?;
        Ok(format!(
            "Great job! You've watered your {}. Next watering is scheduled for {}.",
            self.crop_name,
            next.format("%Y-%m-%d")
        ))
    }

    /// Reminders falling on `today` for this row
    pub fn reminders(&self, today: NaiveDate) -> Result<Vec<CareReminder>, ScheduleError> {
        let record = self.to_record();
        let mut reminders = Vec::new();
        if !record.watered && record.next_watering == today {
            reminders.push(CareReminder::watering(&record.crop_name, today));
        }
        if is_fertilization_due(&record, today)? {
            reminders.push(CareReminder::fertilization(&record.crop_name, today));
        }
        Ok(reminders)
    }
}

impl ScheduleService {
    /// Create a new schedule service
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List a user's schedules, rolling finished cycles forward first
    pub async fn list(&self, user_id: UserId, today: NaiveDate) -> AppResult<Vec<CropScheduleRecord>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM watering_schedules WHERE user_id = $1 ORDER BY crop_name",
            SCHEDULE_COLUMNS
        ))
        .bind(user_id.0)
        .fetch_all(&self.db)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for settle in plan_rollovers(rows, today) {
            let current = match settle {
                Settle::Roll(rollover) => match self.apply_rollover(&rollover).await? {
                    RolloverOutcome::Applied(row) | RolloverOutcome::Superseded(row) => row,
                    RolloverOutcome::Gone => continue,
                },
                Settle::Current(row) => row,
            };
            records.push(current.to_record());
        }
        Ok(records)
    }

    /// Create a schedule for a crop joining the garden
    ///
    /// Returns the existing schedule unchanged when there already is one.
    pub async fn create(
        &self,
        input: CreateScheduleInput,
        today: NaiveDate,
    ) -> AppResult<CropScheduleRecord> {
        input.validate()?;
        let crop_name = input.crop_name.trim();
        validate_crop_name(crop_name).map_err(|msg| AppError::Validation {
            field: "crop_name".to_string(),
            message: msg.to_string(),
        })?;

        let profile = sqlx::query_as::<_, CareProfileRow>(
            r#"
            SELECT growing_time_days, watering_frequency_days, fertilization_frequency_days
            FROM crop_care_profiles
            WHERE crop_name = $1
            "#,
        )
        .bind(crop_name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Care profile for {}", crop_name)))?;

        let inserted = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            INSERT INTO watering_schedules (
                user_id, crop_name, last_watered,
                growing_time_days, watering_frequency_days, fertilization_frequency_days,
                next_watering, watered
            )
            VALUES ($1, $2, NULL, $3, $4, $5, $6, FALSE)
            ON CONFLICT (user_id, crop_name) DO NOTHING
            RETURNING {}
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(input.user_id.0)
        .bind(crop_name)
        .bind(profile.growing_time_days)
        .bind(profile.watering_frequency_days)
        .bind(profile.fertilization_frequency_days)
        .bind(today)
        .fetch_optional(&self.db)
        .await?;

        match inserted {
            Some(row) => {
                tracing::info!(user_id = %input.user_id, crop_name, "Created watering schedule");
                Ok(row.to_record())
            }
            None => {
                let row = self.fetch(input.user_id, crop_name).await?;
                let current = match row.rollover(today)? {
                    Some(rollover) => match self.apply_rollover(&rollover).await? {
                        RolloverOutcome::Applied(row) | RolloverOutcome::Superseded(row) => row,
                        RolloverOutcome::Gone => {
                            return Err(AppError::NotFound(format!("Schedule for {}", crop_name)))
                        }
                    },
                    None => row,
                };
                Ok(current.to_record())
            }
        }
    }

    /// Set the watered flag of one schedule
    pub async fn update_watering(
        &self,
        user_id: UserId,
        crop_name: &str,
        watered: bool,
        today: NaiveDate,
    ) -> AppResult<CropScheduleRecord> {
        let mut tx = self.db.begin().await?;

        let mut row = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM watering_schedules WHERE user_id = $1 AND crop_name = $2 FOR UPDATE",
            SCHEDULE_COLUMNS
        ))
        .bind(user_id.0)
        .bind(crop_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Schedule for {}", crop_name)))?;

        let rolled = row.roll_forward(today)?;
        let changed = row.apply_watering(watered, today);
        if rolled || changed {
            save_row(&mut *tx, &row).await?;
        }
        tx.commit().await?;

        if changed {
            tracing::info!(user_id = %user_id, crop_name, watered, "Updated watering status");
            if watered {
                self.confirm_watering(user_id, &row, today).await;
            }
        } else {
            tracing::debug!(user_id = %user_id, crop_name, watered, "Watering status unchanged");
        }
        Ok(row.to_record())
    }

    /// Delete one schedule
    pub async fn delete(&self, user_id: UserId, crop_name: &str) -> AppResult<()> {
        let result =
            sqlx::query("DELETE FROM watering_schedules WHERE user_id = $1 AND crop_name = $2")
                .bind(user_id.0)
                .bind(crop_name)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Schedule for {}", crop_name)));
        }
        tracing::info!(user_id = %user_id, crop_name, "Deleted watering schedule");
        Ok(())
    }

    /// Roll every finished watered cycle forward
    ///
    /// Returns the changed crop names per user.
    pub async fn roll_forward_all(
        &self,
        today: NaiveDate,
    ) -> AppResult<BTreeMap<UserId, Vec<String>>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            SELECT {} FROM watering_schedules
            WHERE watered = TRUE AND COALESCE(last_watered, next_watering) < $1
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        let mut changed: BTreeMap<UserId, Vec<String>> = BTreeMap::new();
        for settle in plan_rollovers(rows, today) {
            let Settle::Roll(rollover) = settle else {
                continue;
            };
            if let RolloverOutcome::Applied(row) = self.apply_rollover(&rollover).await? {
                changed
                    .entry(UserId(row.user_id))
                    .or_default()
                    .push(row.crop_name);
            }
        }
        Ok(changed)
    }

    /// Claim today's reminders for every schedule not yet reminded today
    ///
    /// A row is claimed by stamping `reminded_on`; concurrent sweepers never
    /// claim the same row twice on one day.
    pub async fn claim_due_reminders(
        &self,
        today: NaiveDate,
    ) -> AppResult<Vec<(UserId, CareReminder)>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            r#"
            SELECT {} FROM watering_schedules
            WHERE reminded_on IS NULL OR reminded_on < $1
            "#,
            SCHEDULE_COLUMNS
        ))
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        let mut claimed = Vec::new();
        for row in rows {
            let reminders = match row.reminders(today) {
                Ok(reminders) if !reminders.is_empty() => reminders,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(user_id = row.user_id, crop_name = %row.crop_name, error = %e, "Skipping schedule reminders");
                    continue;
                }
            };

            let result = sqlx::query(
                r#"
                UPDATE watering_schedules SET reminded_on = $2
                WHERE id = $1 AND (reminded_on IS NULL OR reminded_on < $2)
                "#,
            )
            .bind(row.id)
            .bind(today)
            .execute(&self.db)
            .await?;

            if result.rows_affected() == 1 {
                let user_id = UserId(row.user_id);
                claimed.extend(reminders.into_iter().map(|r| (user_id, r)));
            }
        }
        Ok(claimed)
    }

    async fn fetch(&self, user_id: UserId, crop_name: &str) -> AppResult<ScheduleRow> {
        sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM watering_schedules WHERE user_id = $1 AND crop_name = $2",
            SCHEDULE_COLUMNS
        ))
        .bind(user_id.0)
        .bind(crop_name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Schedule for {}", crop_name)))
    }

    async fn confirm_watering(&self, user_id: UserId, row: &ScheduleRow, today: NaiveDate) {
        let stored = match row.watering_confirmation(today) {
            Ok(message) => NotificationService::new(self.db.clone())
                .create(user_id, &message)
                .await
                .map(|_| ()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = stored {
            tracing::warn!(user_id = %user_id, crop_name = %row.crop_name, error = %e, "Failed to store watering confirmation");
        }
    }

    /// Write a rollover back unless the row changed since it was read
    async fn apply_rollover(&self, rollover: &Rollover) -> AppResult<RolloverOutcome> {
        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM watering_schedules WHERE id = $1 FOR UPDATE",
            SCHEDULE_COLUMNS
        ))
        .bind(rollover.before.id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match current {
            Some(current) if rollover.still_applies(&current) => {
                save_row(&mut *tx, &rollover.rolled).await?;
                RolloverOutcome::Applied(rollover.rolled.clone())
            }
            Some(current) => {
                tracing::debug!(
                    user_id = current.user_id,
                    crop_name = %current.crop_name,
                    "Schedule changed before rollover, keeping stored state"
                );
                RolloverOutcome::Superseded(current)
            }
            None => RolloverOutcome::Gone,
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

async fn save_row<'e, E>(executor: E, row: &ScheduleRow) -> AppResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE watering_schedules SET
            last_watered = $2,
            previous_last_watered = $3,
            next_watering = $4,
            watered = $5,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(row.id)
    .bind(row.last_watered)
    .bind(row.previous_last_watered)
    .bind(row.next_watering)
    .bind(row.watered)
    .execute(executor)
    .await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
