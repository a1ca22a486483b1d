//! Records exchanged with the plant-care REST service.
//!
//! Field names follow the service's snake_case JSON. Timestamps and the
//! precomputed `days_until_water` are parsed leniently: a value the service
//! sends in an unexpected shape becomes `None` instead of failing the whole
//! response.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Smallest accepted watering interval in days.
pub const MIN_WATERING_INTERVAL: i64 = 1;
/// Largest accepted watering interval in days.
pub const MAX_WATERING_INTERVAL: i64 = 365;

// ==================== Enumerations ====================

/// Light preference of a library plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightPreference {
    Sun,
    Shade,
    /// Any value the service sends that is not `sun` or `shade`.
    #[default]
    #[serde(other)]
    Unknown,
}

impl LightPreference {
    /// Wire key of the preference.
    pub fn key(&self) -> &'static str {
        match self {
            LightPreference::Sun => "sun",
            LightPreference::Shade => "shade",
            LightPreference::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LightPreference::Sun => "Sun",
            LightPreference::Shade => "Shade",
            LightPreference::Unknown => "Not specified",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LightPreference::Sun => "☀️",
            LightPreference::Shade => "🌿",
            LightPreference::Unknown => "❓",
        }
    }
}

/// Care difficulty of a library plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CareDifficulty {
    Easy,
    Medium,
    Hard,
    /// Any value the service sends that is not a known difficulty.
    #[default]
    #[serde(other)]
    Unknown,
}

impl CareDifficulty {
    /// Wire key of the difficulty.
    pub fn key(&self) -> &'static str {
        match self {
            CareDifficulty::Easy => "easy",
            CareDifficulty::Medium => "medium",
            CareDifficulty::Hard => "hard",
            CareDifficulty::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CareDifficulty::Easy => "Easy",
            CareDifficulty::Medium => "Medium",
            CareDifficulty::Hard => "Hard",
            CareDifficulty::Unknown => "Not specified",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            CareDifficulty::Easy => "🟢",
            CareDifficulty::Medium => "🟡",
            CareDifficulty::Hard => "🔴",
            CareDifficulty::Unknown => "⚪",
        }
    }
}

/// Account role as reported by the profile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
    #[serde(other)]
    Unknown,
}

// ==================== Library ====================

/// Entry of the shared plant library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryPlant {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub description: String,
    /// Missing, null or unparsable intervals read as `0`.
    #[serde(
        rename = "watering_interval",
        default,
        deserialize_with = "lenient_interval"
    )]
    pub watering_interval_days: i64,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub light_preference: LightPreference,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub care_difficulty: CareDifficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl LibraryPlant {
    /// True when the entry carries a non-blank image URL.
    pub fn has_image(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Payload for creating or replacing a library entry (admin only).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLibraryPlant {
    pub name: String,
    pub description: String,
    #[serde(rename = "watering_interval")]
    pub watering_interval_days: i64,
    pub light_preference: LightPreference,
    pub care_difficulty: CareDifficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Default for NewLibraryPlant {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            watering_interval_days: 7,
            light_preference: LightPreference::Sun,
            care_difficulty: CareDifficulty::Easy,
            image_url: None,
        }
    }
}

impl From<&LibraryPlant> for NewLibraryPlant {
    fn from(plant: &LibraryPlant) -> Self {
        Self {
            name: plant.name.clone(),
            description: plant.description.clone(),
            watering_interval_days: plant.watering_interval_days,
            light_preference: plant.light_preference,
            care_difficulty: plant.care_difficulty,
            image_url: plant.image_url.clone(),
        }
    }
}

/// Reasons an administrative write is rejected before it reaches the service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("plant name is required")]
    MissingName,
    #[error("plant description is required")]
    MissingDescription,
    #[error("watering interval must be between 1 and 365 days, got {0}")]
    IntervalOutOfRange(i64),
    #[error("light preference must be sun or shade")]
    UnknownLight,
    #[error("care difficulty must be easy, medium or hard")]
    UnknownDifficulty,
}

impl NewLibraryPlant {
    /// Check the payload the way the admin forms do.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::MissingDescription);
        }
        if !(MIN_WATERING_INTERVAL..=MAX_WATERING_INTERVAL).contains(&self.watering_interval_days)
        {
            return Err(ValidationError::IntervalOutOfRange(
                self.watering_interval_days,
            ));
        }
        if self.light_preference == LightPreference::Unknown {
            return Err(ValidationError::UnknownLight);
        }
        if self.care_difficulty == CareDifficulty::Unknown {
            return Err(ValidationError::UnknownDifficulty);
        }
        Ok(())
    }

    /// Trim text fields and drop a blank image URL.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.image_url = self
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        self
    }
}

// ==================== Collection ====================

/// A user's personal instance of a library plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPlant {
    pub id: i64,
    pub plant_library_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_watered_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_days")]
    pub days_until_water: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Library name, when the service embeds it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Library watering interval, when the service embeds it.
    #[serde(
        rename = "watering_interval",
        default,
        deserialize_with = "lenient_days",
        skip_serializing_if = "Option::is_none"
    )]
    pub watering_interval_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_preference: Option<LightPreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_difficulty: Option<CareDifficulty>,
}

impl UserPlant {
    /// Name shown on cards: the custom name, else the library name.
    pub fn display_name(&self) -> &str {
        self.custom_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.name.as_deref())
            .unwrap_or("Unnamed plant")
    }
}

/// Payload for adding a library plant to the collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUserPlant {
    pub plant_library_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NewUserPlant {
    /// Blank optional fields are left out of the request.
    pub fn new(plant_library_id: i64, custom_name: Option<&str>, image_url: Option<&str>) -> Self {
        let non_blank = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            plant_library_id,
            custom_name: non_blank(custom_name),
            image_url: non_blank(image_url),
        }
    }
}

/// Partial update of a user plant.
///
/// The outer `Option` marks whether a field is sent at all; an inner `None`
/// is sent as `null` and clears the field on the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UserPlantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
}

impl UserPlantUpdate {
    /// Build an update from edited form values, keeping only changed fields.
    ///
    /// Returns `None` when nothing changed.
    pub fn from_edit(current: &UserPlant, custom_name: &str, image_url: &str) -> Option<Self> {
        fn diff(current: Option<&str>, edited: &str) -> Option<Option<String>> {
            let edited = edited.trim();
            if edited == current.unwrap_or("") {
                return None;
            }
            Some((!edited.is_empty()).then(|| edited.to_string()))
        }

        let update = Self {
            custom_name: diff(current.custom_name.as_deref(), custom_name),
            image_url: diff(current.image_url.as_deref(), image_url),
        };
        (!update.is_empty()).then_some(update)
    }

    pub fn is_empty(&self) -> bool {
        self.custom_name.is_none() && self.image_url.is_none()
    }

    /// Apply the update to a local copy of the plant.
    pub fn apply_to(&self, plant: &UserPlant) -> UserPlant {
        let mut updated = plant.clone();
        if let Some(name) = &self.custom_name {
            updated.custom_name = name.clone();
        }
        if let Some(url) = &self.image_url {
            updated.image_url = url.clone();
        }
        updated
    }
}

// ==================== Accounts ====================

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Profile fields a user may change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ProfileUpdate {
    /// Only administrators send a role; everyone else keeps theirs.
    pub fn new(profile: &Profile) -> Self {
        Self {
            username: profile.username.clone(),
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            role: profile.is_admin().then_some(Role::Admin),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Unread notification from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

// ==================== Lenient Deserializers ====================

/// Parse a timestamp in RFC 3339 or naive `YYYY-MM-DD[T ]HH:MM:SS` (UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(raw)) => parse_timestamp(&raw),
        _ => None,
    })
}

fn lenient_days<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(whole_days))
}

fn lenient_interval<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_days(deserializer)?.unwrap_or(0))
}

/// Null or malformed values fall back to `T::default()`.
fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

/// Whole days from a JSON number or numeric string; fractions round down.
fn whole_days(value: serde_json::Value) -> Option<i64> {
    let float_days = |f: f64| f.is_finite().then(|| f.floor() as i64);
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_days)),
        serde_json::Value::String(raw) => {
            let raw = raw.trim();
            raw.parse::<i64>()
                .ok()
                .or_else(|| raw.parse::<f64>().ok().and_then(float_days))
        }
        _ => None,
    }
}
