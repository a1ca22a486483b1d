//! The signed-in user's plant collection.
//!
//! Refreshes from the service race with local optimistic edits. Every refresh
//! takes a [`RefreshTicket`] when it is issued; a local edit raises a floor
//! past every ticket issued so far. A response is applied only if its ticket
//! is above the floor, so stale or out-of-order responses are dropped instead
//! of overwriting fresher local state.

use std::collections::HashSet;

use crate::{
    library::{EnrichedPlant, LibraryCache, enrich},
    model::{UserPlant, UserPlantUpdate},
    traits::Clock,
    watering,
};

/// Sequence number handed out when a refresh request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, Default)]
pub struct Collection {
    plants: Vec<UserPlant>,
    /// Last sequence number handed out
    issued: u64,
    /// Responses with a ticket at or below this are stale
    floor: u64,
    loaded: bool,
    just_watered: HashSet<i64>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a ticket for a refresh that is about to be sent.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        RefreshTicket(self.issued)
    }

    /// Apply a refresh response. Returns false when the response was stale.
    pub fn apply_refresh(&mut self, ticket: RefreshTicket, plants: Vec<UserPlant>) -> bool {
        if ticket.0 <= self.floor {
            tracing::debug!(
                "Discarding stale collection refresh (ticket {}, floor {})",
                ticket.0,
                self.floor
            );
            return false;
        }
        self.floor = ticket.0;
        self.just_watered
            .retain(|id| plants.iter().any(|p| p.id == *id));
        self.plants = plants;
        self.loaded = true;
        true
    }

    /// Invalidate every refresh issued before a local edit.
    fn local_mutation(&mut self) {
        self.issued += 1;
        self.floor = self.issued;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn plants(&self) -> &[UserPlant] {
        &self.plants
    }

    pub fn get(&self, id: i64) -> Option<&UserPlant> {
        self.plants.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    // ==================== Local Mutations ====================

    /// Optimistically record a watering.
    pub fn mark_watered<C: Clock>(&mut self, id: i64, clock: &C) -> Option<&UserPlant> {
        let index = self.plants.iter().position(|p| p.id == id)?;
        self.local_mutation();
        self.plants[index] = watering::mark_watered(&self.plants[index], clock);
        self.just_watered.insert(id);
        Some(&self.plants[index])
    }

    /// Optimistically apply an edit.
    pub fn update(&mut self, id: i64, update: &UserPlantUpdate) -> Option<&UserPlant> {
        let index = self.plants.iter().position(|p| p.id == id)?;
        self.local_mutation();
        self.plants[index] = update.apply_to(&self.plants[index]);
        Some(&self.plants[index])
    }

    /// Optimistically remove a plant.
    pub fn remove(&mut self, id: i64) -> Option<UserPlant> {
        let index = self.plants.iter().position(|p| p.id == id)?;
        self.local_mutation();
        self.just_watered.remove(&id);
        Some(self.plants.remove(index))
    }

    /// Add a plant the service just created.
    pub fn insert(&mut self, plant: UserPlant) {
        self.local_mutation();
        self.plants.retain(|p| p.id != plant.id);
        self.plants.push(plant);
    }

    pub fn was_just_watered(&self, id: i64) -> bool {
        self.just_watered.contains(&id)
    }

    pub fn clear_just_watered(&mut self) {
        self.just_watered.clear();
    }

    // ==================== Queries ====================

    pub fn enriched(&self, cache: &LibraryCache) -> Vec<EnrichedPlant> {
        self.plants.iter().map(|p| enrich(p, cache)).collect()
    }

    /// Plants due today or overdue, most overdue first.
    pub fn needing_water<C: Clock>(&self, cache: &LibraryCache, clock: &C) -> Vec<EnrichedPlant> {
        let mut urgent: Vec<(i64, EnrichedPlant)> = self
            .plants
            .iter()
            .map(|p| enrich(p, cache))
            .filter_map(|e| {
                let days = e.days_until_water(clock)?;
                watering::needs_watering(Some(days)).then_some((days, e))
            })
            .collect();
        urgent.sort_by_key(|(days, _)| *days);
        urgent.into_iter().map(|(_, e)| e).collect()
    }

    pub fn needing_water_count<C: Clock>(&self, cache: &LibraryCache, clock: &C) -> usize {
        self.plants
            .iter()
            .filter(|p| watering::needs_watering(enrich(p, cache).days_until_water(clock)))
            .count()
    }
}
