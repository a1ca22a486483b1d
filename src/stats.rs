//! Aggregate statistics over the shared plant library.
//!
//! Everything here is a pure reduction over an already fetched list; no input
//! makes it fail. Records with values outside the known categories are left
//! out of that category's buckets but still count toward the total.

use chrono::{DateTime, Utc};

use crate::model::{CareDifficulty, LibraryPlant, LightPreference};

// ==================== Watering Frequency ====================

/// Watering-frequency bucket of a library plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WateringFrequency {
    /// Every 1-3 days
    Frequent,
    /// Every 4-7 days
    Regular,
    /// Every 8-14 days
    Occasional,
    /// Every 15 days or less often
    Rare,
}

impl WateringFrequency {
    /// Declared order, also used to break ties.
    pub const ALL: [WateringFrequency; 4] = [
        WateringFrequency::Frequent,
        WateringFrequency::Regular,
        WateringFrequency::Occasional,
        WateringFrequency::Rare,
    ];

    /// Bucket for an interval; missing or non-positive intervals count as 0.
    pub fn from_interval(interval_days: i64) -> Self {
        match interval_days.max(0) {
            0..=3 => WateringFrequency::Frequent,
            4..=7 => WateringFrequency::Regular,
            8..=14 => WateringFrequency::Occasional,
            _ => WateringFrequency::Rare,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            WateringFrequency::Frequent => "frequent",
            WateringFrequency::Regular => "regular",
            WateringFrequency::Occasional => "occasional",
            WateringFrequency::Rare => "rare",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WateringFrequency::Frequent => "Frequent (1-3 days)",
            WateringFrequency::Regular => "Regular (4-7 days)",
            WateringFrequency::Occasional => "Occasional (8-14 days)",
            WateringFrequency::Rare => "Rare (15+ days)",
        }
    }
}

// ==================== Summary Types ====================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifficultyBreakdown {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl DifficultyBreakdown {
    pub fn get(&self, difficulty: CareDifficulty) -> u32 {
        match difficulty {
            CareDifficulty::Easy => self.easy,
            CareDifficulty::Medium => self.medium,
            CareDifficulty::Hard => self.hard,
            CareDifficulty::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightBreakdown {
    pub sun: u32,
    pub shade: u32,
}

impl LightBreakdown {
    pub fn get(&self, light: LightPreference) -> u32 {
        match light {
            LightPreference::Sun => self.sun,
            LightPreference::Shade => self.shade,
            LightPreference::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WateringBreakdown {
    pub frequent: u32,
    pub regular: u32,
    pub occasional: u32,
    pub rare: u32,
}

impl WateringBreakdown {
    pub fn get(&self, frequency: WateringFrequency) -> u32 {
        match frequency {
            WateringFrequency::Frequent => self.frequent,
            WateringFrequency::Regular => self.regular,
            WateringFrequency::Occasional => self.occasional,
            WateringFrequency::Rare => self.rare,
        }
    }

    fn bump(&mut self, frequency: WateringFrequency) {
        match frequency {
            WateringFrequency::Frequent => self.frequent += 1,
            WateringFrequency::Regular => self.regular += 1,
            WateringFrequency::Occasional => self.occasional += 1,
            WateringFrequency::Rare => self.rare += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageBreakdown {
    pub with: u32,
    pub without: u32,
}

/// Descriptive statistics of the plant library.
///
/// Count breakdowns are raw counts; the `*_percent` twins hold the same
/// buckets as whole percentages of `total`, each rounded independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSummary {
    pub total: u32,
    pub difficulty: DifficultyBreakdown,
    pub difficulty_percent: DifficultyBreakdown,
    pub light: LightBreakdown,
    pub light_percent: LightBreakdown,
    pub watering: WateringBreakdown,
    pub watering_percent: WateringBreakdown,
    pub images: ImageBreakdown,
    pub images_percent: ImageBreakdown,
    /// Mean watering interval in days, rounded half up
    pub average_watering: i64,
    /// Median watering interval in days, rounded half up
    pub median_watering: i64,
    pub predominant_difficulty: Option<CareDifficulty>,
    pub predominant_light: Option<LightPreference>,
    pub predominant_watering: Option<WateringFrequency>,
    pub newest_plant: Option<LibraryPlant>,
    pub oldest_plant: Option<LibraryPlant>,
}

// ==================== Aggregation ====================

/// Reduce the library to its summary statistics.
pub fn aggregate(plants: &[LibraryPlant]) -> StatsSummary {
    if plants.is_empty() {
        return StatsSummary::default();
    }

    let mut summary = StatsSummary {
        total: plants.len() as u32,
        ..Default::default()
    };

    let mut intervals: Vec<i64> = Vec::with_capacity(plants.len());
    let mut newest: Option<(&LibraryPlant, DateTime<Utc>)> = None;
    let mut oldest: Option<(&LibraryPlant, DateTime<Utc>)> = None;

    for plant in plants {
        match plant.care_difficulty {
            CareDifficulty::Easy => summary.difficulty.easy += 1,
            CareDifficulty::Medium => summary.difficulty.medium += 1,
            CareDifficulty::Hard => summary.difficulty.hard += 1,
            CareDifficulty::Unknown => {}
        }

        match plant.light_preference {
            LightPreference::Sun => summary.light.sun += 1,
            LightPreference::Shade => summary.light.shade += 1,
            LightPreference::Unknown => {}
        }

        let interval = plant.watering_interval_days.max(0);
        intervals.push(interval);
        summary
            .watering
            .bump(WateringFrequency::from_interval(interval));

        if plant.has_image() {
            summary.images.with += 1;
        } else {
            summary.images.without += 1;
        }

        if let Some(created) = plant.created_at {
            if newest.is_none_or(|(_, at)| created > at) {
                newest = Some((plant, created));
            }
            if oldest.is_none_or(|(_, at)| created < at) {
                oldest = Some((plant, created));
            }
        }
    }

    let total = summary.total;
    summary.difficulty_percent = DifficultyBreakdown {
        easy: percent(summary.difficulty.easy, total),
        medium: percent(summary.difficulty.medium, total),
        hard: percent(summary.difficulty.hard, total),
    };
    summary.light_percent = LightBreakdown {
        sun: percent(summary.light.sun, total),
        shade: percent(summary.light.shade, total),
    };
    summary.watering_percent = WateringBreakdown {
        frequent: percent(summary.watering.frequent, total),
        regular: percent(summary.watering.regular, total),
        occasional: percent(summary.watering.occasional, total),
        rare: percent(summary.watering.rare, total),
    };
    summary.images_percent = ImageBreakdown {
        with: percent(summary.images.with, total),
        without: percent(summary.images.without, total),
    };

    let sum: i128 = intervals.iter().map(|&days| i128::from(days)).sum();
    summary.average_watering = div_round_half_up(sum, i128::from(total));
    summary.median_watering = median(&mut intervals);

    summary.predominant_difficulty = predominant(
        [
            CareDifficulty::Easy,
            CareDifficulty::Medium,
            CareDifficulty::Hard,
        ],
        |d| summary.difficulty.get(d),
    );
    summary.predominant_light = predominant(
        [LightPreference::Sun, LightPreference::Shade],
        |l| summary.light.get(l),
    );
    summary.predominant_watering =
        predominant(WateringFrequency::ALL, |f| summary.watering.get(f));

    summary.newest_plant = newest.map(|(plant, _)| plant.clone());
    summary.oldest_plant = oldest.map(|(plant, _)| plant.clone());

    summary
}

/// Whole percentage of `count` in `total`, rounded half up.
pub fn percent(count: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    div_round_half_up(i128::from(count) * 100, i128::from(total)) as u32
}

/// `numerator / denominator` rounded half up, for non-negative inputs.
///
/// Works in `i128` so sums of wire intervals cannot overflow.
fn div_round_half_up(numerator: i128, denominator: i128) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let rounded = (2 * numerator + denominator) / (2 * denominator);
    i64::try_from(rounded).unwrap_or(i64::MAX)
}

/// Median of the values; the two middle values are averaged for even lengths.
fn median(values: &mut [i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        div_round_half_up(i128::from(values[mid - 1]) + i128::from(values[mid]), 2)
    }
}

/// Category with the highest non-zero count; earlier categories win ties.
fn predominant<T: Copy, const N: usize>(order: [T; N], count: impl Fn(T) -> u32) -> Option<T> {
    let mut best: Option<(T, u32)> = None;
    for category in order {
        let n = count(category);
        if n > 0 && best.is_none_or(|(_, top)| n > top) {
            best = Some((category, n));
        }
    }
    best.map(|(category, _)| category)
}
