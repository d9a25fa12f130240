//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, DeliveryConfig, Environment, JwtConfig,
    ServerConfig, SnowflakeConfig,
};
