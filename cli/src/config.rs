use std::path::Path;

use serde::Deserialize;
use tools::toml;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub hub: hub::Config,

    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    pub server_addr: String,
    pub metrics_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub: hub::Config::default(),
            general: GeneralConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:8080".to_owned(),
            metrics_addr: "127.0.0.1:9007".to_owned(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        // A missing file is not an error: every setting has a default.
        let path = path.as_ref();
        if !path.exists() {
            return Self::default().validate();
        }
        toml::parse_file::<Self>(path)?.validate()
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        self.hub.validate()?;
        Ok(self)
    }
}
