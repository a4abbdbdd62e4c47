//! Configuration for `MediaNamer`.
//!
//! Handles reading configuration from CLI arguments and the user config file.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;
use serde::Deserialize;

use media_namer::oracle::{DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, OracleConfig};

use crate::MediaNameArgs;

/// Default ledger file, relative to the current working directory.
const DEFAULT_LEDGER: &str = "media_naming_report.csv";

/// Environment variable used for the API key when it is not given otherwise.
pub const API_KEY_ENV: &str = "MEDIA_NAMER_API_KEY";

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct MediaNameConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    extensions: Vec<String>,
    #[serde(default)]
    ledger: Option<PathBuf>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    model: Option<String>,
    /// Replaces the built-in instructions sent to the naming service.
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    verbose: bool,
    #[serde(default)]
    yes: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    media_name: MediaNameConfig,
}

/// Final config created from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) dryrun: bool,
    pub(crate) extensions: Vec<String>,
    pub(crate) ledger: PathBuf,
    pub(crate) oracle: OracleConfig,
    pub(crate) root: PathBuf,
    pub(crate) skip_suggest: bool,
    pub(crate) verbose: bool,
    pub(crate) yes: bool,
}

impl MediaNameConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub(crate) fn get_user_config() -> Result<Self> {
        let Some(path) = media_namer::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.media_name)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or the root directory is invalid.
    pub fn from_args(args: MediaNameArgs) -> Result<Self> {
        let user_config = MediaNameConfig::get_user_config()?;
        Self::combine(args, user_config, env::var(API_KEY_ENV).ok())
    }

    /// Merge CLI arguments over the config file over defaults.
    ///
    /// The API key comes from the CLI, then the config file, then the environment.
    fn combine(args: MediaNameArgs, user_config: MediaNameConfig, env_api_key: Option<String>) -> Result<Self> {
        let root = media_namer::resolve_input_dir(args.path.as_deref())?;

        let extensions: Vec<String> = args
            .extension
            .into_iter()
            .chain(user_config.extensions)
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .unique()
            .collect();

        let api_key = args
            .api_key
            .or(user_config.api_key)
            .or(env_api_key)
            .filter(|key| !key.trim().is_empty());

        let oracle = OracleConfig {
            api_key,
            base_url: args
                .base_url
                .or(user_config.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: args.model.or(user_config.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: user_config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: user_config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system_prompt: user_config.system_prompt,
        };

        Ok(Self {
            dryrun: args.print || user_config.dryrun,
            extensions,
            ledger: args
                .ledger
                .or(user_config.ledger)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER)),
            oracle,
            root,
            skip_suggest: args.skip_suggest,
            verbose: args.verbose || user_config.verbose,
            yes: args.yes || user_config.yes,
        })
    }
}
