//! Session cache of the plant library and the join that decorates user
//! plants with their library entry.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    model::{CareDifficulty, LibraryPlant, LightPreference, UserPlant},
    traits::Clock,
    watering::{self, WateringInfo},
};

/// Interval assumed for a user plant whose library entry is unknown.
pub const DEFAULT_WATERING_INTERVAL: i64 = 7;

// ==================== Library Cache ====================

/// Library entries keyed by id, populated once per session.
#[derive(Debug, Clone, Default)]
pub struct LibraryCache {
    plants: Option<HashMap<i64, LibraryPlant>>,
}

impl LibraryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache contents with a fresh library listing.
    pub fn populate(&mut self, plants: Vec<LibraryPlant>) {
        tracing::debug!("Caching {} library plants", plants.len());
        self.plants = Some(plants.into_iter().map(|p| (p.id, p)).collect());
    }

    pub fn is_populated(&self) -> bool {
        self.plants.is_some()
    }

    pub fn get(&self, id: i64) -> Option<&LibraryPlant> {
        self.plants.as_ref()?.get(&id)
    }

    pub fn len(&self) -> usize {
        self.plants.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached entries sorted by id.
    pub fn plants(&self) -> Vec<&LibraryPlant> {
        let mut plants: Vec<_> = self.plants.iter().flat_map(|m| m.values()).collect();
        plants.sort_by_key(|p| p.id);
        plants
    }

    /// Drop the cache so the next access fetches the library again.
    pub fn invalidate(&mut self) {
        self.plants = None;
    }
}

// ==================== Enrichment ====================

/// A user plant joined with the library fields it displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPlant {
    pub plant: UserPlant,
    pub library_name: Option<String>,
    pub watering_interval_days: i64,
    pub light_preference: LightPreference,
    pub care_difficulty: CareDifficulty,
    /// False when the library entry was not found and defaults were used
    pub library_hit: bool,
}

impl EnrichedPlant {
    pub fn display_name(&self) -> &str {
        self.plant
            .custom_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.library_name.as_deref())
            .unwrap_or("Unnamed plant")
    }

    /// Days until water, preferring the service's value.
    pub fn days_until_water<C: Clock>(&self, clock: &C) -> Option<i64> {
        watering::resolve_days_until_water(&self.plant, Some(self.watering_interval_days), clock)
    }

    pub fn watering_info<C: Clock>(&self, just_watered: bool, clock: &C) -> WateringInfo {
        watering::classify(self.days_until_water(clock), just_watered)
    }
}

/// Join a user plant with its library entry.
///
/// A library hit supplies every field. On a miss the values the service
/// embedded in the user plant are used, and a missing or non-positive
/// interval falls back to [`DEFAULT_WATERING_INTERVAL`].
pub fn enrich(plant: &UserPlant, cache: &LibraryCache) -> EnrichedPlant {
    match cache.get(plant.plant_library_id) {
        Some(entry) => EnrichedPlant {
            plant: plant.clone(),
            library_name: Some(entry.name.clone()),
            watering_interval_days: entry.watering_interval_days,
            light_preference: entry.light_preference,
            care_difficulty: entry.care_difficulty,
            library_hit: true,
        },
        None => {
            tracing::debug!(
                "Library plant {} not cached for user plant {}",
                plant.plant_library_id,
                plant.id
            );
            EnrichedPlant {
                plant: plant.clone(),
                library_name: plant.name.clone(),
                watering_interval_days: plant
                    .watering_interval_days
                    .filter(|days| *days > 0)
                    .unwrap_or(DEFAULT_WATERING_INTERVAL),
                light_preference: plant.light_preference.unwrap_or_default(),
                care_difficulty: plant.care_difficulty.unwrap_or_default(),
                library_hit: false,
            }
        }
    }
}

pub fn enrich_all(plants: &[UserPlant], cache: &LibraryCache) -> Vec<EnrichedPlant> {
    plants.iter().map(|p| enrich(p, cache)).collect()
}

// ==================== Search ====================

/// Case-insensitive match over name, description, difficulty and light.
/// A blank query matches everything.
pub fn matches_query(plant: &LibraryPlant, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [
        plant.name.as_str(),
        plant.description.as_str(),
        plant.care_difficulty.key(),
        plant.light_preference.key(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&query))
}

pub fn search<'a>(plants: &'a [LibraryPlant], query: &str) -> Vec<&'a LibraryPlant> {
    plants.iter().filter(|p| matches_query(p, query)).collect()
}

/// True when the library plant is already in the user's collection.
pub fn is_in_collection(library_id: i64, collection: &[UserPlant]) -> bool {
    collection.iter().any(|p| p.plant_library_id == library_id)
}
