use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub network: NetworkConfig,
    pub refresh: RefreshConfig,
    pub notifications: NotificationConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    pub notification_poll_interval_secs: u64,
    pub plant_status_interval_secs: u64,
    /// Delay before re-fetching the collection after a local mutation
    pub reconcile_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            notification_poll_interval_secs: 60,
            plant_status_interval_secs: 30,
            reconcile_delay_ms: 1000,
        }
    }
}

impl RefreshConfig {
    /// Collection refresh period; zero is raised to one second.
    pub fn plant_status_period(&self) -> Duration {
        Duration::from_secs(self.plant_status_interval_secs.max(1))
    }

    /// Notification poll period; zero is raised to one second.
    pub fn notification_poll_period(&self) -> Duration {
        Duration::from_secs(self.notification_poll_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Ntfy.sh topic for phone reminders (e.g., "my-fern-reminders")
    pub ntfy_topic: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ntfy_topic: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Where the session token is kept; defaults to the user config directory
    pub token_file: Option<PathBuf>,
}

impl StorageConfig {
    pub fn token_path(&self) -> PathBuf {
        self.token_file
            .clone()
            .unwrap_or_else(|| config_dir().join("token"))
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plant-care")
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let config_dir = config_dir();

        let builder = Config::builder()
            // 1. Load default values
            // API
            .set_default("api.base_url", "http://localhost:8080/api")?
            // Network
            .set_default("network.request_timeout_secs", 30)?
            .set_default("network.connect_timeout_secs", 10)?
            // Refresh
            .set_default("refresh.notification_poll_interval_secs", 60)?
            .set_default("refresh.plant_status_interval_secs", 30)?
            .set_default("refresh.reconcile_delay_ms", 1000)?
            // Notifications
            .set_default("notifications.enabled", false)?
            .set_default("notifications.ntfy_topic", None::<String>)?
            // Storage
            .set_default("storage.token_file", None::<String>)?

            // 2. Load from local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))

            // 3. Load from user config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))

            // 4. Load from Environment variables (PLANT_CARE__API__BASE_URL=...)
            .add_source(Environment::with_prefix("PLANT_CARE").separator("__"));

        let s = builder.build()?;
        Ok(s.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Default Value Tests ====================

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/api");
    }

    #[test]
    fn test_network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_refresh_config_defaults() {
        let config = RefreshConfig::default();
        assert_eq!(config.notification_poll_interval_secs, 60);
        assert_eq!(config.plant_status_interval_secs, 30);
        assert_eq!(config.reconcile_delay_ms, 1000);
    }

    #[test]
    fn test_refresh_periods_are_never_zero() {
        let config = RefreshConfig {
            notification_poll_interval_secs: 0,
            plant_status_interval_secs: 0,
            reconcile_delay_ms: 0,
        };
        assert_eq!(config.plant_status_period(), Duration::from_secs(1));
        assert_eq!(config.notification_poll_period(), Duration::from_secs(1));

        let config = RefreshConfig::default();
        assert_eq!(config.plant_status_period(), Duration::from_secs(30));
        assert_eq!(config.notification_poll_period(), Duration::from_secs(60));
    }

    #[test]
    fn test_notification_config_defaults() {
        let config = NotificationConfig::default();
        assert!(!config.enabled);
        assert!(config.ntfy_topic.is_none());
    }

    #[test]
    fn test_storage_token_path() {
        let config = StorageConfig::default();
        assert!(config.token_path().ends_with("plant-care/token"));

        let config = StorageConfig {
            token_file: Some(PathBuf::from("/tmp/plant-token")),
        };
        assert_eq!(config.token_path(), PathBuf::from("/tmp/plant-token"));
    }

    // ==================== Config Loading Tests ====================

    #[test]
    fn test_config_load_with_defaults() {
        // Should succeed even without a config file
        let result = AppConfig::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_loaded_config_has_expected_structure() {
        let config = AppConfig::load().expect("Config should load");

        assert!(!config.api.base_url.is_empty());
        assert!(config.network.request_timeout_secs > 0);
        assert!(config.refresh.notification_poll_interval_secs > 0);
        assert!(config.refresh.plant_status_interval_secs > 0);
    }

    #[test]
    fn test_config_structs_are_debug() {
        let config = NetworkConfig::default();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("NetworkConfig"));
        assert!(debug_str.contains("request_timeout_secs"));
    }

    // ==================== Environment Variable Override Tests ====================

    /// Helper to safely set and remove environment variables in tests.
    /// SAFETY: These tests run sequentially and clean up after themselves.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        // SAFETY: Test environment, single-threaded access
        unsafe {
            std::env::set_var(key, value);
        }
        let result = f();
        unsafe {
            std::env::remove_var(key);
        }
        result
    }

    /// Helper to safely set multiple environment variables in tests.
    fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        // SAFETY: Test environment, single-threaded access
        for (key, value) in vars {
            unsafe {
                std::env::set_var(key, value);
            }
        }
        let result = f();
        for (key, _) in vars {
            unsafe {
                std::env::remove_var(key);
            }
        }
        result
    }

    #[test]
    fn test_env_var_overrides_base_url() {
        let env_key = "PLANT_CARE__API__BASE_URL";
        let test_url = "https://plants.example.com/api";

        let config = with_env_var(env_key, test_url, || {
            AppConfig::load().expect("Config should load")
        });

        assert_eq!(
            config.api.base_url, test_url,
            "Environment variable should override api.base_url"
        );
    }

    #[test]
    fn test_env_var_overrides_network_timeout() {
        let env_key = "PLANT_CARE__NETWORK__REQUEST_TIMEOUT_SECS";

        let config = with_env_var(env_key, "120", || {
            AppConfig::load().expect("Config should load")
        });

        assert_eq!(config.network.request_timeout_secs, 120);
    }

    #[test]
    fn test_env_var_overrides_notifications() {
        let vars = [
            ("PLANT_CARE__NOTIFICATIONS__ENABLED", "true"),
            ("PLANT_CARE__NOTIFICATIONS__NTFY_TOPIC", "fern-alerts"),
        ];

        let config = with_env_vars(&vars, || AppConfig::load().expect("Config should load"));

        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.ntfy_topic.as_deref(), Some("fern-alerts"));
    }

    // ==================== Config Value Validation Tests ====================

    #[test]
    fn test_config_default_values_are_reasonable() {
        let network = NetworkConfig::default();
        assert!(
            network.request_timeout_secs >= network.connect_timeout_secs,
            "Request timeout should be >= connect timeout"
        );

        let refresh = RefreshConfig::default();
        assert!(
            refresh.plant_status_interval_secs <= refresh.notification_poll_interval_secs,
            "Plant status refresh should not lag behind notification polling"
        );
    }
}
