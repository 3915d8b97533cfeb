// region:    --- Imports
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

// endregion: --- Imports

const DEFAULT_JWT_SECRET: &str = "your-secret-key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("환경 변수 {key} 값이 올바르지 않습니다: {value}")]
    Invalid { key: &'static str, value: String },
}

// region:    --- Config
/// 서비스 설정 (환경 변수 기반)
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub kafka_brokers: Option<String>,
    pub notification_topic: String,
    pub jwt_secret: String,
    pub sweep_interval: Duration,
    pub bid_grace_window: chrono::Duration,
    pub bid_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            database_max_connections: 5,
            kafka_brokers: None,
            notification_topic: "auction-notifications".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            sweep_interval: Duration::from_secs(60),
            bid_grace_window: chrono::Duration::seconds(60),
            bid_timeout: Duration::from_millis(5000),
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키-값 조회 함수에서 설정 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = non_empty("JWT_SECRET").unwrap_or(defaults.jwt_secret);
        if jwt_secret == DEFAULT_JWT_SECRET {
            warn!(
                "{:<12} --> JWT_SECRET 이 설정되지 않아 기본값을 사용합니다.",
                "Config"
            );
        }

        let sweep_secs: u64 = parse_or(&lookup, "AUCTION_SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "AUCTION_SWEEP_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        let grace_secs: i64 = parse_or(&lookup, "BID_GRACE_SECONDS", 60)?;
        let bid_grace_window =
            chrono::Duration::try_seconds(grace_secs.max(0)).ok_or_else(|| {
                ConfigError::Invalid {
                    key: "BID_GRACE_SECONDS",
                    value: grace_secs.to_string(),
                }
            })?;
        let timeout_ms: u64 = parse_or(&lookup, "BID_TIMEOUT_MS", 5000)?;

        Ok(Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            kafka_brokers: non_empty("KAFKA_BROKERS"),
            notification_topic: non_empty("NOTIFICATION_TOPIC")
                .unwrap_or(defaults.notification_topic),
            jwt_secret,
            sweep_interval: Duration::from_secs(sweep_secs),
            bid_grace_window,
            bid_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}
// endregion: --- Config

// endregion: --- Tests
