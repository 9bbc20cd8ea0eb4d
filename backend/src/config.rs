//! Configuration management for the Distribution Order Management backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with DOM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

use shared::types::{FulfillmentRegion, PriceMode, WarehouseKey};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Outbound mail configuration
    pub mail: MailConfig,

    /// Warehouse topology (which location serves which tax region)
    pub warehouses: WarehouseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// Transactional mail API endpoint
    pub api_endpoint: String,

    /// Mail API key
    pub api_key: String,

    /// Sender address
    pub from_address: String,

    /// Operations/finance address copied on every order transition
    pub operations_address: String,

    /// Fulfillment-center address per warehouse key
    #[serde(default)]
    pub warehouse_addresses: HashMap<String, String>,
}

impl MailConfig {
    /// Fulfillment-center address for a warehouse, if one is configured.
    pub fn address_for_warehouse(&self, warehouse: &WarehouseKey) -> Option<&str> {
        self.warehouse_addresses
            .get(warehouse.as_str())
            .map(String::as_str)
    }
}

/// Which warehouse serves which tax region. Warehouse keys are an open
/// set: adding a location is a configuration change, not a code change.
#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    /// Warehouse fulfilling domestic orders; also the canonical location
    /// for legacy stock values with no per-warehouse split.
    pub domestic: WarehouseKey,

    /// Warehouse fulfilling international (export) orders
    pub export: WarehouseKey,
}

impl WarehouseConfig {
    /// The warehouse an order under `mode` draws stock from.
    pub fn for_price_mode(&self, mode: PriceMode) -> &WarehouseKey {
        match mode.fulfillment_region() {
            FulfillmentRegion::Domestic => &self.domestic,
            FulfillmentRegion::Export => &self.export,
        }
    }

    /// The price modes a warehouse actor at `warehouse` is responsible
    /// for. Unknown warehouses see nothing.
    pub fn price_modes_for(&self, warehouse: &WarehouseKey) -> Vec<PriceMode> {
        if *warehouse == self.export {
            vec![PriceMode::SinIvaInternacional]
        } else if *warehouse == self.domestic {
            vec![PriceMode::ConIva, PriceMode::SinIva]
        } else {
            Vec::new()
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("DOM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("warehouses.domestic", "medellin")?
            .set_default("warehouses.export", "guarne")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (DOM_ prefix)
            .add_source(
                Environment::with_prefix("DOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouses() -> WarehouseConfig {
        WarehouseConfig {
            domestic: WarehouseKey::new("medellin"),
            export: WarehouseKey::new("guarne"),
        }
    }

    #[test]
    fn price_mode_selects_warehouse() {
        let cfg = warehouses();
        assert_eq!(cfg.for_price_mode(PriceMode::ConIva).as_str(), "medellin");
        assert_eq!(cfg.for_price_mode(PriceMode::SinIva).as_str(), "medellin");
        assert_eq!(
            cfg.for_price_mode(PriceMode::SinIvaInternacional).as_str(),
            "guarne"
        );
    }

    #[test]
    fn warehouse_scopes_price_modes() {
        let cfg = warehouses();
        assert_eq!(
            cfg.price_modes_for(&WarehouseKey::new("guarne")),
            vec![PriceMode::SinIvaInternacional]
        );
        assert_eq!(
            cfg.price_modes_for(&WarehouseKey::new("medellin")),
            vec![PriceMode::ConIva, PriceMode::SinIva]
        );
        assert!(cfg.price_modes_for(&WarehouseKey::new("bogota")).is_empty());
    }
}
