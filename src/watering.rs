use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};

use crate::{model::UserPlant, traits::Clock};

/// Overdue values derived locally never go below this many days.
pub const OVERDUE_FLOOR_DAYS: i64 = -7;

/// Plants due within this many days are flagged as "soon".
pub const SOON_THRESHOLD_DAYS: i64 = 3;

const SECONDS_PER_DAY: i64 = 24 * 3600;

// ==================== Status Types ====================

/// Urgency of a plant's next watering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WateringStatus {
    /// Watered in this session and due again later
    WateredNow,
    /// Due today
    Today,
    /// Past its due date
    Overdue,
    /// Due tomorrow
    Tomorrow,
    /// Due within the next few days
    Soon,
    /// Nothing to do for a while
    Ok,
    /// Not enough information to tell
    Unknown,
}

impl WateringStatus {
    pub fn key(&self) -> &'static str {
        match self {
            WateringStatus::WateredNow => "watered_now",
            WateringStatus::Today => "today",
            WateringStatus::Overdue => "overdue",
            WateringStatus::Tomorrow => "tomorrow",
            WateringStatus::Soon => "soon",
            WateringStatus::Ok => "ok",
            WateringStatus::Unknown => "unknown",
        }
    }
}

/// Everything a card needs to render the watering badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WateringInfo {
    pub status: WateringStatus,
    pub label: String,
    /// Hex color of the badge
    pub color: &'static str,
    pub icon: &'static str,
}

impl WateringInfo {
    fn new(status: WateringStatus, label: impl Into<String>) -> Self {
        let (color, icon) = match status {
            WateringStatus::WateredNow => ("#4cc9f0", "💧"),
            WateringStatus::Today | WateringStatus::Overdue => ("#ff4757", "⚠️"),
            WateringStatus::Tomorrow | WateringStatus::Soon => ("#ffa502", "⏳"),
            WateringStatus::Ok => ("#2ed573", "✅"),
            WateringStatus::Unknown => ("#666666", "❓"),
        };
        Self {
            status,
            label: label.into(),
            color,
            icon,
        }
    }
}

// ==================== Due Date Calculation ====================

/// Whole days elapsed between `last` and `now`, rounded down.
pub fn days_since(last: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Days until the next watering using the system clock.
/// This is a convenience wrapper around [`days_until_water_with_clock`].
pub fn days_until_water(last_watered_at: Option<DateTime<Utc>>, interval_days: i64) -> i64 {
    days_until_water_with_clock(last_watered_at, interval_days, &crate::traits::SystemClock)
}

/// Days until the next watering, measured against a custom clock.
///
/// A plant that was never watered is due now (`0`). Overdue values are
/// capped at [`OVERDUE_FLOOR_DAYS`].
pub fn days_until_water_with_clock<C: Clock>(
    last_watered_at: Option<DateTime<Utc>>,
    interval_days: i64,
    clock: &C,
) -> i64 {
    match last_watered_at {
        None => 0,
        Some(last) => {
            let elapsed = days_since(last, clock.now_utc());
            interval_days
                .saturating_sub(elapsed)
                .max(OVERDUE_FLOOR_DAYS)
        }
    }
}

/// Pick the days-until-water value to display for a plant.
///
/// The service's precomputed value wins and is used unclamped. Without it the
/// value is derived locally, which needs a positive interval; with no usable
/// interval the result is unknown.
pub fn resolve_days_until_water<C: Clock>(
    plant: &UserPlant,
    interval_days: Option<i64>,
    clock: &C,
) -> Option<i64> {
    if let Some(days) = plant.days_until_water {
        return Some(days);
    }
    let interval = interval_days.filter(|days| *days > 0)?;
    Some(days_until_water_with_clock(
        plant.last_watered_at,
        interval,
        clock,
    ))
}

/// A plant needs watering once it is due today or overdue.
pub fn needs_watering(days_until_water: Option<i64>) -> bool {
    days_until_water.is_some_and(|days| days <= 0)
}

/// Optimistic local update after the user waters a plant.
pub fn mark_watered<C: Clock>(plant: &UserPlant, clock: &C) -> UserPlant {
    UserPlant {
        last_watered_at: Some(clock.now_utc()),
        days_until_water: Some(0),
        ..plant.clone()
    }
}

/// Watering interval of a plant, recovered from the precomputed due date when
/// the service did not send the interval itself.
pub fn infer_interval<C: Clock>(plant: &UserPlant, clock: &C) -> Option<i64> {
    if let Some(interval) = plant.watering_interval_days.filter(|days| *days > 0) {
        return Some(interval);
    }
    let days_until = plant.days_until_water?;
    let last = plant.last_watered_at?;
    Some(days_since(last, clock.now_utc()).saturating_add(days_until))
}

// ==================== Classification ====================

/// Classify the urgency of a watering and build its badge.
///
/// Rules are checked in order; the first match wins.
pub fn classify(days_until_water: Option<i64>, just_watered: bool) -> WateringInfo {
    let Some(days) = days_until_water else {
        return WateringInfo::new(WateringStatus::Unknown, "Watering info unavailable");
    };

    match days {
        0 if just_watered => WateringInfo::new(WateringStatus::WateredNow, "Watered just now!"),
        0 => WateringInfo::new(WateringStatus::Today, "Watering required today!"),
        d if d < 0 => WateringInfo::new(
            WateringStatus::Overdue,
            format!("Overdue by {} {}", d.unsigned_abs(), days_word(d.unsigned_abs())),
        ),
        1 => WateringInfo::new(WateringStatus::Tomorrow, "Water tomorrow"),
        d if d <= SOON_THRESHOLD_DAYS => {
            WateringInfo::new(WateringStatus::Soon, format!("Water in {} days", d))
        }
        d => WateringInfo::new(WateringStatus::Ok, format!("Water in {} days", d)),
    }
}

fn days_word(days: u64) -> &'static str {
    if days == 1 { "day" } else { "days" }
}

// ==================== Display Text ====================

/// Describe when a plant was last watered, relative to `now`.
pub fn last_watered_text<Tz: TimeZone>(last: Option<DateTime<Utc>>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(last_utc) = last else {
        return "Never watered".to_string();
    };

    let last = last_utc.with_timezone(&now.timezone());
    let today = now.date_naive();

    if last.date_naive() == today {
        return format!("Today at {}", last.format("%H:%M"));
    }
    if today.pred_opt() == Some(last.date_naive()) {
        return format!("Yesterday at {}", last.format("%H:%M"));
    }

    let elapsed = days_since(last_utc, now.with_timezone(&Utc));
    if (0..7).contains(&elapsed) {
        return format!("{} {} ago", elapsed, days_word(elapsed.unsigned_abs()));
    }

    if last.year() == now.year() {
        last.format("%-d %B").to_string()
    } else {
        last.format("%-d %B %Y").to_string()
    }
}

/// Describe when a plant is next due, relative to `now`.
pub fn next_watering_text<Tz: TimeZone>(days_until_water: Option<i64>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match days_until_water {
        None => "Not scheduled".to_string(),
        Some(days) if days <= 0 => "Today".to_string(),
        Some(1) => "Tomorrow".to_string(),
        Some(days) => {
            let Some(due) = ChronoDuration::try_days(days)
                .and_then(|offset| now.clone().checked_add_signed(offset))
            else {
                return format!("In {} days", days);
            };
            if days <= 7 {
                due.format("%A").to_string()
            } else {
                due.format("%-d %B").to_string()
            }
        }
    }
}
