//! Watering reminders sent from the daemon loop.

use std::collections::HashSet;

use anyhow::Result;

use crate::{
    library::EnrichedPlant,
    traits::{Clock, Notifier},
    watering,
};

/// Debounces reminders per plant: a plant is announced once when it becomes
/// due, and again only after it was watered and became due anew.
#[derive(Debug, Clone, Default)]
pub struct ReminderTracker {
    enabled: bool,
    due: HashSet<i64>,
}

impl ReminderTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            due: HashSet::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle reminders. State keeps tracking while disabled so re-enabling
    /// does not announce plants that were already due.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_due(&self, id: i64) -> bool {
        self.due.contains(&id)
    }

    /// Compare the collection against the last check and send a reminder for
    /// every plant that just became due. Returns the number sent.
    pub fn check<C: Clock, N: Notifier + ?Sized>(
        &mut self,
        plants: &[EnrichedPlant],
        clock: &C,
        notifier: &N,
    ) -> Result<usize> {
        let mut sent = 0;
        let mut due_now = HashSet::new();

        for plant in plants {
            let days = plant.days_until_water(clock);
            if !watering::needs_watering(days) {
                continue;
            }
            let id = plant.plant.id;
            due_now.insert(id);

            if self.enabled && !self.due.contains(&id) {
                let info = watering::classify(days, false);
                notifier.notify(
                    &format!("{} needs water", plant.display_name()),
                    &format!("{} {}", info.icon, info.label),
                )?;
                tracing::info!("Sent watering reminder for plant {}", id);
                sent += 1;
            }
        }

        self.due = due_now;
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::library::{LibraryCache, enrich};
    use crate::model::UserPlant;
    use crate::traits::{MockClock, MockNotifier};

    fn plant(id: i64, days: Option<i64>) -> EnrichedPlant {
        let plant = UserPlant {
            id,
            plant_library_id: 1,
            custom_name: Some(format!("Plant {}", id)),
            image_url: None,
            last_watered_at: None,
            days_until_water: days,
            created_at: None,
            name: None,
            watering_interval_days: None,
            light_preference: None,
            care_difficulty: None,
        };
        enrich(&plant, &LibraryCache::new())
    }

    fn clock() -> MockClock {
        MockClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_reminder_fires_once_per_due_period() {
        let clock = clock();
        let notifier = MockNotifier::new();
        let mut tracker = ReminderTracker::new(true);

        assert_eq!(tracker.check(&[plant(1, Some(0))], &clock, &notifier).unwrap(), 1);
        assert_eq!(tracker.check(&[plant(1, Some(-1))], &clock, &notifier).unwrap(), 0);
        assert_eq!(notifier.notification_count(), 1);

        // Watered, then due again
        tracker.check(&[plant(1, Some(4))], &clock, &notifier).unwrap();
        assert!(!tracker.is_due(1));
        tracker.check(&[plant(1, Some(0))], &clock, &notifier).unwrap();
        assert_eq!(notifier.notification_count(), 2);
    }

    #[test]
    fn test_reminder_text() {
        let clock = clock();
        let notifier = MockNotifier::new();
        let mut tracker = ReminderTracker::new(true);

        tracker.check(&[plant(7, Some(-2))], &clock, &notifier).unwrap();

        let (title, body) = &notifier.get_notifications()[0];
        assert_eq!(title, "Plant 7 needs water");
        assert!(body.contains("Overdue by 2 days"));
    }

    #[test]
    fn test_disabled_tracker_still_tracks_state() {
        let clock = clock();
        let notifier = MockNotifier::new();
        let mut tracker = ReminderTracker::new(false);

        tracker.check(&[plant(1, Some(0))], &clock, &notifier).unwrap();
        assert!(!notifier.was_called());
        assert!(tracker.is_due(1));

        tracker.set_enabled(true);
        tracker.check(&[plant(1, Some(0))], &clock, &notifier).unwrap();
        assert!(!notifier.was_called());
    }

    #[test]
    fn test_unknown_and_future_plants_are_ignored() {
        let clock = clock();
        let notifier = MockNotifier::new();
        let mut tracker = ReminderTracker::new(true);

        // Unknown interval on a miss falls back to the default; with no
        // watering timestamp the plant is due now
        let plants = [plant(1, Some(3)), plant(2, None)];
        let sent = tracker.check(&plants, &clock, &notifier).unwrap();
        assert_eq!(sent, 1);
        assert!(tracker.is_due(2));
        assert!(!tracker.is_due(1));
    }

    #[test]
    fn test_due_date_reached_as_clock_advances() {
        let clock = clock();
        let notifier = MockNotifier::new();
        let mut tracker = ReminderTracker::new(true);

        let mut watered = plant(1, None);
        watered.plant.last_watered_at = Some(clock.now_utc());
        let plants = [watered];

        tracker.check(&plants, &clock, &notifier).unwrap();
        assert!(!notifier.was_called());

        clock.advance(Duration::days(7));
        tracker.check(&plants, &clock, &notifier).unwrap();
        assert_eq!(notifier.notification_count(), 1);
    }
}
