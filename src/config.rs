use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_path")]
    pub data_path: String,
}

impl Config {
    /// Loads configuration from environment variables (PORT, DATA_PATH),
    /// falling back to the defaults when unset.
    pub fn from_env() -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }
}

fn default_port() -> u16 {
    3000
}

fn default_data_path() -> String {
    "data/db.json".to_string()
}
