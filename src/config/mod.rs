use std::str::FromStr;

use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::utils::MAX_DATE_RANGE_DAYS;

/// One week.
pub const MAX_INTERVAL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Ten years.
pub const MAX_EXPIRY_MINUTES: i64 = 10 * 365 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub fetcher: FetcherConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_max_posts_per_fetch")]
    pub max_posts_per_fetch: usize,
    #[serde(default = "default_date_range_days")]
    pub date_range_days: i64,
    #[serde(default = "default_autostart")]
    pub autostart: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,
}

impl JwtConfig {
    /// Signing algorithm; only the HMAC family works with a shared secret.
    pub fn algorithm(&self) -> anyhow::Result<Algorithm> {
        let algorithm = Algorithm::from_str(self.algorithm.trim())
            .map_err(|_| anyhow::anyhow!("Unknown JWT algorithm: {}", self.algorithm))?;

        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => anyhow::bail!("JWT algorithm {:?} needs a key pair, only HS256/HS384/HS512 are supported", other),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_backend() -> StoreBackend {
    StoreBackend::Mongo
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_interval_seconds() -> u64 {
    60
}

fn default_max_posts_per_fetch() -> usize {
    10
}

fn default_date_range_days() -> i64 {
    365
}

fn default_autostart() -> bool {
    true
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_expiry_minutes() -> i64 {
    60
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("database.backend", "mongo")?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "posts_service")?
            .set_default("source.base_url", "https://jsonplaceholder.typicode.com")?
            .set_default("source.timeout_seconds", 30)?
            .set_default("fetcher.interval_seconds", 60)?
            .set_default("fetcher.max_posts_per_fetch", 10)?
            .set_default("fetcher.date_range_days", 365)?
            .set_default("fetcher.autostart", true)?
            .set_default("jwt.secret", "development-secret-change-in-production")?
            .set_default("jwt.algorithm", "HS256")?
            .set_default("jwt.expiry_minutes", 60)?
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fetcher.interval_seconds == 0 {
            anyhow::bail!("fetcher.interval_seconds must be greater than zero");
        }
        if self.fetcher.max_posts_per_fetch == 0 {
            anyhow::bail!("fetcher.max_posts_per_fetch must be greater than zero");
        }
        if self.fetcher.interval_seconds > MAX_INTERVAL_SECONDS {
            anyhow::bail!("fetcher.interval_seconds must be at most {}", MAX_INTERVAL_SECONDS);
        }
        if !(1..=MAX_DATE_RANGE_DAYS).contains(&self.fetcher.date_range_days) {
            anyhow::bail!("fetcher.date_range_days must be between 1 and {}", MAX_DATE_RANGE_DAYS);
        }
        if !(1..=MAX_EXPIRY_MINUTES).contains(&self.jwt.expiry_minutes) {
            anyhow::bail!("jwt.expiry_minutes must be between 1 and {}", MAX_EXPIRY_MINUTES);
        }
        if self.jwt.secret.is_empty() {
            anyhow::bail!("jwt.secret must not be empty");
        }
        self.jwt.algorithm()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: "mongodb://localhost:27017".to_string(),
                name: "posts_service_test".to_string(),
            },
            source: SourceConfig {
                base_url: "http://localhost:9".to_string(),
                timeout_seconds: 5,
            },
            fetcher: FetcherConfig {
                interval_seconds: 60,
                max_posts_per_fetch: 10,
                date_range_days: 365,
                autostart: false,
            },
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                algorithm: "HS256".to_string(),
                expiry_minutes: 60,
            },
        }
    }

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = sample();
        config.fetcher.interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_date_range_rejected() {
        let mut config = sample();
        config.fetcher.date_range_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hmac_algorithms_accepted() {
        let mut config = sample();
        for name in ["HS256", "HS384", "HS512"] {
            config.jwt.algorithm = name.to_string();
            assert!(config.jwt.algorithm().is_ok(), "{name} should be accepted");
        }
    }

    #[test]
    fn test_asymmetric_and_unknown_algorithms_rejected() {
        let mut config = sample();
        config.jwt.algorithm = "RS256".to_string();
        assert!(config.validate().is_err());

        config.jwt.algorithm = "none".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_windows_rejected() {
        let mut config = sample();
        config.fetcher.date_range_days = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.jwt.expiry_minutes = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.fetcher.interval_seconds = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.fetcher.date_range_days = MAX_DATE_RANGE_DAYS;
        config.jwt.expiry_minutes = MAX_EXPIRY_MINUTES;
        config.fetcher.interval_seconds = MAX_INTERVAL_SECONDS;
        assert!(config.validate().is_ok());
    }
}
