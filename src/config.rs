use std::path::Path;
use std::time::Duration;

use config_file::FromConfigFile;
use serde::Deserialize;

use crate::colors::{self, Color};
use crate::error::Result;
use crate::lightstate;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub device_id: String,
    pub tempo: u32,
    pub colors: Vec<String>,
    pub request_timeout_ms: u64,
    pub strobe_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:3000".to_string(),
            device_id: "C82E4761852A".to_string(),
            tempo: lightstate::DEFAULT_TEMPO,
            colors: vec!["#FE00AE".to_string(), "#00FFDD".to_string()],
            request_timeout_ms: 1000,
            strobe_interval_ms: 80,
        }
    }
}

impl Config {
    /// Reads the file if one is given, defaults otherwise. The format follows
    /// the file extension.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Ok(Config::from_config_file(path)?)
            }
            None => Ok(Config::default()),
        }
    }

    pub fn tempo(&self) -> Result<u32> {
        lightstate::parse_tempo(&self.tempo.to_string())
    }

    pub fn colors(&self) -> Vec<Color> {
        match colors::parse_color_list(&self.colors) {
            Ok(colors) => colors,
            Err(err) => {
                log::warn!("{err}, using the default colors");
                colors::default_colors()
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn strobe_interval(&self) -> Duration {
        Duration::from_millis(self.strobe_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::LightError;

    fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("taktlicht-{}-{name}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn defaults_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tempo().unwrap(), 120);
        assert_eq!(config.colors(), colors::default_colors());
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
        assert_eq!(config.strobe_interval(), Duration::from_millis(80));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = write_config(
            "partial.toml",
            "tempo = 128\ncolors = [\"red\", \"bogus\", \"#00ff00\"]\n",
        );
        let config = Config::load(Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.tempo().unwrap(), 128);
        assert_eq!(config.colors().len(), 2);
        assert_eq!(config.base_url, "http://localhost:3000");
    }

    #[test]
    fn out_of_range_tempo_is_rejected() {
        let config = Config {
            tempo: 20,
            ..Config::default()
        };
        assert!(matches!(config.tempo(), Err(LightError::InvalidTempo(_))));
    }

    #[test]
    fn unusable_colors_fall_back() {
        let config = Config {
            colors: vec!["nope".to_string()],
            ..Config::default()
        };
        assert_eq!(config.colors(), colors::default_colors());
    }
}
