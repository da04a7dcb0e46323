use std::env;

use log::*;
use mos_common::parse_boolean_flag;

const DEFAULT_MOS_HOST: &str = "127.0.0.1";
const DEFAULT_MOS_PORT: u16 = 8360;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// When set, pending schema migrations are applied on startup.
    pub auto_migrate: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MOS_HOST.to_string(),
            port: DEFAULT_MOS_PORT,
            database_url: String::default(),
            auto_migrate: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MOS_HOST").ok().unwrap_or_else(|| {
            warn!("🪛️ MOS_HOST is not set. Using the default, {DEFAULT_MOS_HOST}");
            DEFAULT_MOS_HOST.into()
        });
        let port = env::var("MOS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    warn!("🪛️ {s} is not a valid port for MOS_PORT. {e} Using the default, {DEFAULT_MOS_PORT}");
                    DEFAULT_MOS_PORT
                })
            })
            .unwrap_or_else(|_| {
                warn!("🪛️ MOS_PORT is not set. Using the default, {DEFAULT_MOS_PORT}");
                DEFAULT_MOS_PORT
            });
        let database_url = env::var("MOS_DATABASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ MOS_DATABASE_URL is not set. Using the default, sqlite://data/mos_store.db");
            "sqlite://data/mos_store.db".into()
        });
        let auto_migrate = parse_boolean_flag(env::var("MOS_AUTO_MIGRATE").ok(), false);
        Self { host, port, database_url, auto_migrate }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8360);
        assert!(!config.auto_migrate);
    }
}
