use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use serde::Deserialize;

/// Command line flags; each one overrides the matching environment variable.
#[derive(Parser, Debug, Default)]
#[command(name = "construction_manager", about = "Terminal client for construction project tracking")]
pub struct Cli {
    /// Base URL of the project management API
    #[arg(long)]
    pub api_url: Option<String>,

    /// File that receives the application log
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Forget the stored session before starting
    #[arg(long)]
    pub logout: bool,
}

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the REST backend; `--api-url` may supply it instead
    #[serde(default)]
    pub api_url: String,
    /// Where the sign-in session is cached
    #[serde(default)]
    pub session_path: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Filter directive for the log, e.g. `info` or `construction_manager=debug`
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).context("invalid configuration in the environment")
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| data_dir().join("session.json"))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| data_dir().join("construction_manager.log"))
    }

    fn apply(&mut self, cli: &Cli) {
        if let Some(api_url) = &cli.api_url {
            self.api_url = api_url.clone();
        }
        if let Some(log_file) = &cli.log_file {
            self.log_file = Some(log_file.clone());
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("construction_manager")
}

/// Initialize environment variables and load configuration
pub fn init(cli: &Cli) -> Result<Config> {
    resolve(Config::load()?, cli)
}

fn resolve(mut config: Config, cli: &Cli) -> Result<Config> {
    config.apply(cli);
    if config.api_url.is_empty() {
        bail!("API_URL must be set in the environment, a .env file or with --api-url");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            api_url: "http://env.example".to_string(),
            session_path: None,
            log_file: None,
            log_level: None,
        }
    }

    #[test]
    fn cli_flags_override_environment() {
        let mut config = base();
        let cli = Cli {
            api_url: Some("http://flag.example".to_string()),
            log_file: Some(PathBuf::from("/tmp/cm.log")),
            logout: false,
        };
        config.apply(&cli);
        assert_eq!(config.api_url(), "http://flag.example");
        assert_eq!(config.log_file(), PathBuf::from("/tmp/cm.log"));
    }

    #[test]
    fn defaults_land_in_data_dir() {
        let config = base();
        assert_eq!(config.log_level(), "info");
        assert!(config.session_path().ends_with("construction_manager/session.json"));
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn url_flag_keeps_other_environment_settings() {
        let config = Config::from_vars(vars(&[
            ("SESSION_PATH", "/tmp/cm/session.json"),
            ("LOG_FILE", "/tmp/cm/app.log"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        let cli = Cli {
            api_url: Some("http://flag.example".to_string()),
            ..Cli::default()
        };

        let config = resolve(config, &cli).unwrap();
        assert_eq!(config.api_url(), "http://flag.example");
        assert_eq!(config.session_path(), PathBuf::from("/tmp/cm/session.json"));
        assert_eq!(config.log_file(), PathBuf::from("/tmp/cm/app.log"));
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn missing_url_everywhere_is_an_error() {
        let config = Config::from_vars(vars(&[("LOG_LEVEL", "warn")])).unwrap();
        assert!(resolve(config, &Cli::default()).is_err());
    }

    #[test]
    fn environment_url_is_used_without_flag() {
        let config = Config::from_vars(vars(&[("API_URL", "http://env.example")])).unwrap();
        let config = resolve(config, &Cli::default()).unwrap();
        assert_eq!(config.api_url(), "http://env.example");
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from(["construction_manager", "--api-url", "http://x", "--logout"]);
        assert_eq!(cli.api_url.as_deref(), Some("http://x"));
        assert!(cli.logout);
    }
}
