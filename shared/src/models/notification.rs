//! Notification models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification identifier, unique within one user's log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entry in a user's notification log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Response of the mark-all-read endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub marked_count: u64,
}

/// Response of the clear-all endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearAllResponse {
    pub cleared_count: u64,
}
