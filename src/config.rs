//! Process configuration, read once from the environment at startup.

use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATA_FILE: &str = "data/reservations.json";
const DEFAULT_SCHEMA_FILE: &str = "schema/reservation_schema.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_file: PathBuf,
    pub schema_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            schema_file: PathBuf::from(DEFAULT_SCHEMA_FILE),
        }
    }
}

impl AppConfig {
    /// Reads `PORT`, `DATA_FILE`, and `SCHEMA_FILE`, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.port),
            data_file: env::var("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            schema_file: env::var("SCHEMA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.schema_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_repository_layout() {
        let config = AppConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.data_file, PathBuf::from("data/reservations.json"));
        assert_eq!(
            config.schema_file,
            PathBuf::from("schema/reservation_schema.json")
        );
    }
}
