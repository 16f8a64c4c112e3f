use serde::Deserialize;

pub const DEFAULT_DB_URL: &str = "sqlite://practice.sqlite3";
pub const DEFAULT_SET_ID: &str = "demo";

/// Binary settings: defaults, then `practice.toml`, then `PRACTICE_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub db_url: String,
    pub log_filter: String,
    pub persist_attempts: bool,
    pub set_id: String,
}

impl AppSettings {
    /// # Errors
    ///
    /// Returns `config::ConfigError` when a source cannot be read or a value
    /// has the wrong type.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("practice")
    }

    fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("db_url", DEFAULT_DB_URL)?
            .set_default("log_filter", "info")?
            .set_default("persist_attempts", true)?
            .set_default("set_id", DEFAULT_SET_ID)?
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("PRACTICE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
