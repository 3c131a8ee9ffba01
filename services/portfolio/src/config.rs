use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the portfolio store
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Blob store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Carousel layout configuration
    #[serde(default)]
    pub carousel: CarouselConfig,
    /// Upload validation configuration
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Local blob store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the SQLite database file holding stored entries
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// How long SQLite waits on a locked database, in seconds
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
    /// Per-operation timeout in seconds (0 disables the timeout)
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
    /// Run migrations on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

/// Carousel layout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CarouselConfig {
    /// Item width as a fraction of the viewport width
    #[serde(default = "default_item_width_ratio")]
    pub item_width_ratio: f64,
    /// Gap between items in pixels
    #[serde(default = "default_gap_px")]
    pub gap_px: f64,
}

/// Upload validation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted payload in bytes
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

// Default value functions
fn default_service_name() -> String {
    "portfolio-store".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/portfolio.db")
}

fn default_max_connections() -> u32 {
    4
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_operation_timeout_secs() -> u64 {
    30
}

fn default_run_migrations() -> bool {
    true
}

fn default_item_width_ratio() -> f64 {
    0.30 // 30vw cards
}

fn default_gap_px() -> f64 {
    24.0
}

fn default_max_payload_bytes() -> usize {
    512 * 1024 * 1024 // 512MB
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with default values
            .set_default("service.name", "portfolio-store")?
            .set_default("service.log_level", "info")?
            // Add config file if present
            .add_source(config::File::with_name("config/portfolio").required(false))
            .add_source(config::File::with_name("/etc/portfolio/portfolio").required(false))
            // Override with environment variables
            // PORTFOLIO__STORE__DATABASE_PATH -> store.database_path
            .add_source(
                config::Environment::with_prefix("PORTFOLIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }
}

impl StoreConfig {
    /// Store configuration pointing at the given database file
    pub fn at(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Default::default()
        }
    }

    /// Get connection acquire timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get SQLite busy timeout as Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }

    /// Per-operation timeout, `None` when disabled
    pub fn operation_timeout(&self) -> Option<Duration> {
        match self.operation_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            busy_timeout_secs: default_busy_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            item_width_ratio: default_item_width_ratio(),
            gap_px: default_gap_px(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_gap_px(), 24.0);
        assert_eq!(default_item_width_ratio(), 0.30);
        assert_eq!(default_operation_timeout_secs(), 30);
    }

    #[test]
    fn test_zero_operation_timeout_disables_timeout() {
        let mut store = StoreConfig::at("/tmp/portfolio.db");
        assert_eq!(store.operation_timeout(), Some(Duration::from_secs(30)));

        store.operation_timeout_secs = 0;
        assert_eq!(store.operation_timeout(), None);
    }

    #[test]
    fn test_store_timeouts() {
        let mut store = StoreConfig::at("/tmp/portfolio.db");
        store.connect_timeout_secs = 7;
        store.busy_timeout_secs = 2;

        assert_eq!(store.connect_timeout(), Duration::from_secs(7));
        assert_eq!(store.busy_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: Config = config::Config::builder()
            .set_override("store.database_path", "/var/lib/portfolio/items.db")
            .unwrap()
            .set_override("carousel.gap_px", 32.0)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(
            config.store.database_path,
            PathBuf::from("/var/lib/portfolio/items.db")
        );
        assert_eq!(config.store.max_connections, 4);
        assert_eq!(config.carousel.gap_px, 32.0);
        assert_eq!(config.carousel.item_width_ratio, 0.30);
        assert_eq!(config.service.name, "portfolio-store");
    }
}
