//! Session Marker

use serde::{Deserialize, Serialize};

/// Locally persisted session marker with an absolute expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMarker {
    /// When the session was opened (Unix millis)
    pub started_at: i64,
    /// When the session stops being valid (Unix millis)
    pub expires_at: i64,
}

impl SessionMarker {
    pub fn new(started_at: i64, ttl_millis: i64) -> Self {
        Self {
            started_at,
            expires_at: started_at.saturating_add(ttl_millis),
        }
    }

    pub fn is_active(&self, now_millis: i64) -> bool {
        now_millis < self.expires_at
    }
}
