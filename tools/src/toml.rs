use std::{fs, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;
use toml;

/// Reads a TOML file from disk and deserializes it into `T`.
///
/// This is the loading half of configuration handling: semantic checks
/// (address validity, timer ordering and so on) stay with the config types
/// themselves. Failures carry the offending path so a bad `--config`
/// argument is obvious from the log line alone.
///
/// # Errors
/// - The file cannot be read.
/// - The contents are not valid TOML for `T`.
///
/// ```
/// use anyhow::Result;
/// use serde::Deserialize;
/// use tools::toml::parse_file;
///
/// #[derive(Deserialize)]
/// struct HubSettings {
///     listen_addr: String,
/// }
///
/// let settings: Result<HubSettings> = parse_file("config.toml");
/// ```
pub fn parse_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Config file {} is not valid TOML", path.display()))
}
