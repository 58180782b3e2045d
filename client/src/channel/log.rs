//! Read/unread notification log with duplicate suppression

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use shared::{AlertEvent, CareReminder, NotificationId, NotificationRecord};

/// Identity of a pushed event for duplicate suppression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub kind: String,
    pub message: String,
}

impl DedupKey {
    pub fn alert(alert: &AlertEvent) -> Self {
        Self {
            kind: alert.alert_type.as_str().to_string(),
            message: alert.message.clone(),
        }
    }

    pub fn reminder(reminder: &CareReminder) -> Self {
        Self {
            kind: format!("{}_reminder", reminder.kind.as_str()),
            message: reminder.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RecentEntry {
    id: NotificationId,
    at: DateTime<Utc>,
}

/// Notification log for one signed-in user, newest first
///
/// An event is suppressed while an unread record for the same key, appended
/// within the window, is still in the log. Marking it read or clearing it
/// lets the next occurrence through.
#[derive(Debug)]
pub struct NotificationLog {
    records: Vec<NotificationRecord>,
    recent: HashMap<DedupKey, RecentEntry>,
    window: Duration,
    last_id: i64,
}

impl NotificationLog {
    pub fn new(window: Duration) -> Self {
        Self {
            records: Vec::new(),
            recent: HashMap::new(),
            window,
            last_id: 0,
        }
    }

    /// Append an unread record unless it duplicates a recent one
    pub fn append(
        &mut self,
        key: DedupKey,
        message: String,
        now: DateTime<Utc>,
    ) -> Option<NotificationRecord> {
        let window = self.window;
        self.recent.retain(|_, entry| now - entry.at <= window);
        if self.recent.contains_key(&key) {
            return None;
        }

        let id = self.next_id(now);
        let record = NotificationRecord {
            id,
            message,
            timestamp: now,
            read: false,
        };
        self.records.insert(0, record.clone());
        self.recent.insert(key, RecentEntry { id, at: now });
        Some(record)
    }

    /// Local ids are millisecond timestamps, bumped to stay strictly increasing
    fn next_id(&mut self, now: DateTime<Utc>) -> NotificationId {
        self.last_id = now.timestamp_millis().max(self.last_id + 1);
        NotificationId(self.last_id)
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|r| !r.read).count()
    }

    pub fn unread_ids(&self) -> Vec<NotificationId> {
        self.records
            .iter()
            .filter(|r| !r.read)
            .map(|r| r.id)
            .collect()
    }

    pub fn all_ids(&self) -> Vec<NotificationId> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Mark the given records read; returns how many changed
    pub fn mark_read(&mut self, ids: &[NotificationId]) -> usize {
        let mut changed = 0;
        for record in self.records.iter_mut() {
            if !record.read && ids.contains(&record.id) {
                record.read = true;
                changed += 1;
            }
        }
        self.forget_acknowledged();
        changed
    }

    /// Remove the given records; returns how many were removed
    pub fn remove(&mut self, ids: &[NotificationId]) -> usize {
        let before = self.records.len();
        self.records.retain(|r| !ids.contains(&r.id));
        self.forget_acknowledged();
        before - self.records.len()
    }

    /// Replace the log with the server's records
    ///
    /// Unread server records repeating a newer unread message within the window
    /// are collapsed into it. Recent keys follow their message to the matching
    /// unread server record.
    pub fn replace_with(&mut self, server_records: Vec<NotificationRecord>) {
        let previous: HashMap<NotificationId, String> = self
            .records
            .iter()
            .map(|r| (r.id, r.message.clone()))
            .collect();

        let window = self.window;
        let mut kept: Vec<NotificationRecord> = Vec::with_capacity(server_records.len());
        for record in server_records {
            let repeated = !record.read
                && kept.iter().any(|k| {
                    !k.read
                        && k.message == record.message
                        && k.timestamp.max(record.timestamp) - k.timestamp.min(record.timestamp)
                            <= window
                });
            if !repeated {
                kept.push(record);
            }
        }
        self.records = kept;

        let records = &self.records;
        self.recent.retain(|_, entry| {
            let Some(message) = previous.get(&entry.id) else {
                return false;
            };
            match records.iter().find(|r| !r.read && &r.message == message) {
                Some(server) => {
                    entry.id = server.id;
                    true
                }
                None => false,
            }
        });
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.recent.clear();
    }

    fn forget_acknowledged(&mut self) {
        let records = &self.records;
        self.recent
            .retain(|_, entry| records.iter().any(|r| r.id == entry.id && !r.read));
    }
}
