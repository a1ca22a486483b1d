//! Seams for time and reminder delivery.
//!
//! Watering math reads the time through [`Clock`] and reminders go out
//! through [`Notifier`], so both can be swapped for mocks in tests.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};

// ==================== Clock Trait ====================

/// Source of "now" for every due-date calculation.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned time that tests move forward by hand.
///
/// Clones share the same instant, so a clone handed to a scheduler sees
/// every `advance` made through the original.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ==================== Notifier Trait ====================

/// Trait for delivering reminders to the user.
pub trait Notifier: Send + Sync {
    /// Send a notification with the given title and body.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Notifier that logs reminders and forwards them to the desktop and ntfy.sh.
#[derive(Debug, Clone, Default)]
pub struct CombinedNotifier {
    ntfy_topic: Option<String>,
}

impl CombinedNotifier {
    /// Create a new combined notifier.
    ///
    /// # Arguments
    /// * `ntfy_topic` - Optional ntfy.sh topic name for phone notifications
    pub fn new(ntfy_topic: Option<String>) -> Self {
        Self { ntfy_topic }
    }
}

impl Notifier for CombinedNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        tracing::info!("{}: {}", title, body);

        #[cfg(feature = "desktop")]
        {
            notify_rust::Notification::new()
                .summary(title)
                .body(body)
                .appname("Plant Care")
                .show()?;
        }

        if let Some(ref topic) = self.ntfy_topic {
            let url = format!("https://ntfy.sh/{}", topic);
            let message = format!("{}\n{}", title, body);

            // Fire and forget so a slow ntfy.sh never stalls the poll loop
            std::thread::spawn(move || {
                match reqwest::blocking::Client::builder()
                    .timeout(std::time::Duration::from_secs(10))
                    .build()
                {
                    Ok(client) => {
                        if let Err(e) = client.post(&url).body(message).send() {
                            tracing::warn!("Failed to deliver ntfy notification: {}", e);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to build ntfy client: {}", e),
                }
            });
        }

        Ok(())
    }
}

/// Mock notifier for testing that records all notifications.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNotifier {
    /// Create a new mock notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all notifications that have been sent.
    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    /// Get the count of notifications sent.
    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    /// Check if any notification was sent.
    pub fn was_called(&self) -> bool {
        !self.notifications.lock().unwrap().is_empty()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::watering::{WateringStatus, classify, days_until_water_with_clock};

    #[test]
    fn test_system_clock_drives_due_dates() {
        let watered = Utc::now();
        assert_eq!(days_until_water_with_clock(Some(watered), 5, &SystemClock), 5);
    }

    #[test]
    fn test_mock_clock_clones_share_time() {
        let watered = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        let clock = MockClock::new(watered);
        let scheduler_clock = clock.clone();

        clock.advance(Duration::days(2));
        let days = days_until_water_with_clock(Some(watered), 3, &scheduler_clock);
        assert_eq!(days, 1);
        assert_eq!(classify(Some(days), false).status, WateringStatus::Tomorrow);

        // Partial days do not count
        clock.advance(Duration::hours(23));
        assert_eq!(
            days_until_water_with_clock(Some(watered), 3, &scheduler_clock),
            1
        );
    }

    #[test]
    fn test_combined_notifier_without_topic_succeeds() {
        #[cfg(not(feature = "desktop"))]
        {
            let notifier = CombinedNotifier::new(None);
            assert!(notifier.notify("Fern needs water", "⚠️ Watering required today!").is_ok());
        }
    }

    #[test]
    fn test_mock_notifier_records_reminders_in_order() {
        let notifier = MockNotifier::new();
        assert!(!notifier.was_called());

        notifier.notify("Fern needs water", "⚠️ Overdue by 2 days").unwrap();
        notifier.notify("Cactus needs water", "⚠️ Watering required today!").unwrap();

        assert_eq!(notifier.notification_count(), 2);
        let titles: Vec<_> = notifier
            .get_notifications()
            .into_iter()
            .map(|(title, _)| title)
            .collect();
        assert_eq!(titles, vec!["Fern needs water", "Cactus needs water"]);
    }
}
