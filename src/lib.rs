//! Plant Care Library
//!
//! Client-side core of the plant-care tracker: watering schedules, library
//! statistics, the collection state and the REST client, exposed for the
//! binary and for testing.

pub mod api;
pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod library;
pub mod model;
pub mod notification;
pub mod reminder;
pub mod session;
pub mod stats;
pub mod traits;
pub mod watering;

// Re-export commonly used types
pub use api::PlantApiClient;
pub use collection::{Collection, RefreshTicket};
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use library::{EnrichedPlant, LibraryCache, enrich, matches_query, search};
pub use model::{
    CareDifficulty, LibraryPlant, LightPreference, NewLibraryPlant, Notification, Profile,
    UserPlant, UserPlantUpdate, ValidationError,
};
pub use reminder::ReminderTracker;
pub use session::{Session, TokenStore};
pub use stats::{StatsSummary, WateringFrequency, aggregate};
pub use traits::{Clock, CombinedNotifier, MockClock, MockNotifier, Notifier, SystemClock};
pub use watering::{
    WateringInfo, WateringStatus, classify, days_until_water, days_until_water_with_clock,
    mark_watered, needs_watering, resolve_days_until_water,
};
