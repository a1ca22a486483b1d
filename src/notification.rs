//! Presentation of unread service notifications.

use chrono::{DateTime, Utc};

use crate::model::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Watering,
    NewPlant,
    Health,
    General,
}

impl NotificationKind {
    /// Classify a message by the first keyword group it mentions.
    pub fn from_message(message: &str) -> Self {
        let message = message.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| message.contains(w));

        if mentions(&["water"]) {
            NotificationKind::Watering
        } else if mentions(&["added", "add "]) {
            NotificationKind::NewPlant
        } else if mentions(&["health", "condition"]) {
            NotificationKind::Health
        } else {
            NotificationKind::General
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NotificationKind::Watering => "💧",
            NotificationKind::NewPlant => "🌿",
            NotificationKind::Health => "❤️",
            NotificationKind::General => "🔔",
        }
    }
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        NotificationKind::from_message(&self.message)
    }
}

/// Relative age of a notification.
pub fn time_ago(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created_at else {
        return "Recently".to_string();
    };

    let elapsed = now - created;
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{} min ago", minutes)
    } else if hours < 24 {
        format!("{} h ago", hours)
    } else if days < 7 {
        format!("{} days ago", days)
    } else {
        created.format("%-d %B %Y").to_string()
    }
}

/// Unread notifications with local dismissal.
///
/// The service has no read-receipt endpoint, so dismissed ids are remembered
/// here and filtered out of later polls.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    unread: Vec<Notification>,
    dismissed: std::collections::HashSet<i64>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the unread list with a poll result. Returns the notifications
    /// that were not seen before.
    pub fn update(&mut self, polled: Vec<Notification>) -> Vec<Notification> {
        let fresh: Vec<Notification> = polled
            .iter()
            .filter(|n| !self.dismissed.contains(&n.id))
            .filter(|n| !self.unread.iter().any(|u| u.id == n.id))
            .cloned()
            .collect();
        self.unread = polled
            .into_iter()
            .filter(|n| !self.dismissed.contains(&n.id))
            .collect();
        fresh
    }

    pub fn unread(&self) -> &[Notification] {
        &self.unread
    }

    pub fn unread_count(&self) -> usize {
        self.unread.len()
    }

    pub fn dismiss(&mut self, id: i64) {
        self.dismissed.insert(id);
        self.unread.retain(|n| n.id != id);
    }

    pub fn dismiss_all(&mut self) {
        self.dismissed.extend(self.unread.iter().map(|n| n.id));
        self.unread.clear();
    }
}
