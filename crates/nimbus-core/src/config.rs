use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that overrides `weather.api_key`
pub const API_KEY_ENV: &str = "NIMBUS_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(skip)]
    pub config_dir: PathBuf,

    /// Weather API settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Device location settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Reverse geocoding settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. Never logged.
    #[serde(default, alias = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API host, without the `/data/2.5` path
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Prefix for icon image URLs
    #[serde(default = "default_icon_base_url")]
    pub icon_base_url: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Transport-level retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_icon_base_url() -> String {
    "http://openweathermap.org/img/wn".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            icon_base_url: default_icon_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

// Hand-written so the key never ends up in logs
impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("icon_base_url", &self.icon_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl WeatherConfig {
    /// The API key, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Fixed latitude; when set together with longitude the device position
    /// is taken from config instead of a lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// Whether the user allows locating the device by IP address
    #[serde(default = "default_allow_ip_lookup")]
    pub allow_ip_lookup: bool,

    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,
}

fn default_allow_ip_lookup() -> bool {
    true
}

fn default_ip_lookup_url() -> String {
    "http://ip-api.com/json".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            allow_ip_lookup: default_allow_ip_lookup(),
            ip_lookup_url: default_ip_lookup_url(),
        }
    }
}

impl LocationConfig {
    /// Configured coordinates, only when both halves are present
    pub fn fixed_coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim host
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,

    /// Nominatim requires an identifying User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    concat!("Nimbus/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nimbus");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            location: LocationConfig::default(),
            geocoding: GeocodingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't
    /// exist, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Self::default();
            config.save()?;
            config
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Apply overrides from the environment. `lookup` is `std::env::var` in
    /// production.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using weather API key from {}", API_KEY_ENV);
            self.weather.api_key = Some(key);
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.weather.api_key().is_none() {
            result.add_error(
                "weather.api_key",
                format!("Weather API key is not set (use config or {})", API_KEY_ENV),
            );
        }

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        self.validate_url(
            &self.weather.icon_base_url,
            "weather.icon_base_url",
            &mut result,
        );
        self.validate_url(&self.geocoding.base_url, "geocoding.base_url", &mut result);

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.weather.max_retries > 10 {
            result.add_warning(
                "weather.max_retries",
                "More than 10 retries will make failures very slow to surface",
            );
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("location.latitude", "Latitude must be within -90..=90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error(
                        "location.longitude",
                        "Longitude must be within -180..=180",
                    );
                }
            }
            (None, None) => {
                if self.location.allow_ip_lookup {
                    self.validate_url(
                        &self.location.ip_lookup_url,
                        "location.ip_lookup_url",
                        &mut result,
                    );
                } else {
                    result.add_warning(
                        "location",
                        "No fixed coordinates and IP lookup disabled - location will be denied",
                    );
                }
            }
            _ => {
                result.add_error(
                    "location",
                    "latitude and longitude must be set together",
                );
            }
        }

        if self.geocoding.user_agent.trim().is_empty() {
            result.add_error("geocoding.user_agent", "User-Agent must not be empty");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nimbus");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn configured() -> Config {
        let mut config = Config::default();
        config.weather.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_configured_default_is_valid() {
        let result = configured().validate();
        assert!(result.is_valid(), "Config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_missing_api_key_is_error() {
        let result = Config::default().validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_key"));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let mut config = Config::default();
        config.weather.api_key = Some("   ".to_string());
        assert!(config.weather.api_key().is_none());
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = configured();
        config.weather.base_url = "ftp://api.example.com".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_half_configured_coordinates() {
        let mut config = configured();
        config.location.latitude = Some(41.7);
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "location"));
    }

    #[test]
    fn test_out_of_range_latitude() {
        let mut config = configured();
        config.location.latitude = Some(123.0);
        config.location.longitude = Some(44.8);
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "location.latitude"));
    }

    #[test]
    fn test_no_location_source_is_warning() {
        let mut config = configured();
        config.location.allow_ip_lookup = false;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "location"));
    }

    #[test]
    fn test_env_override_sets_api_key() {
        let mut config = Config::default();
        config.apply_env_overrides(|name| {
            (name == API_KEY_ENV).then(|| "from-env".to_string())
        });
        assert_eq!(config.weather.api_key(), Some("from-env"));
    }

    #[test]
    fn test_blank_env_does_not_override() {
        let mut config = configured();
        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config.weather.api_key(), Some("test-key"));
    }

    #[test]
    fn test_load_from_accepts_camel_case_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[weather]\napiKey = \"abc123\"\n\n[location]\nlatitude = 41.7151\nlongitude = 44.8271"
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.api_key(), Some("abc123"));
        assert_eq!(config.location.fixed_coordinates(), Some((41.7151, 44.8271)));
        assert_eq!(config.weather.base_url, "https://api.openweathermap.org");
        assert_eq!(config.config_dir, dir.path());
    }

    #[test]
    fn test_load_from_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\napi_key = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let debug = format!("{:?}", configured().weather);
        assert!(!debug.contains("test-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
