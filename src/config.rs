//! Launch settings: command line first, then `PLAYSPEC_*` env vars, then the
//! optional JSON startup file.

use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::scene::StartOptions;
use crate::spec::GameSpec;

pub const DEFAULT_CONFIG_PATH: &str = "playspec.json";
pub const DEFAULT_ASSETS_DIR: &str = "assets";
pub const DEFAULT_API_ADDR: &str = "127.0.0.1:3000";

#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct StartupConfig {
    pub assets_dir: Option<String>,
    pub api_addr: Option<String>,
    pub seed: Option<u64>,
    pub scene: Option<String>,
    pub texture_filter: Option<String>,
}

pub fn load_startup_config() -> StartupConfig {
    let path = std::env::var("PLAYSPEC_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<StartupConfig>(&contents) {
            Ok(cfg) => {
                println!("[Playspec] Loaded startup config from {path}");
                cfg
            }
            Err(e) => {
                eprintln!("[Playspec] Failed to parse {path}: {e}");
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub spec_path: PathBuf,
    pub headless: bool,
    pub watch: bool,
    pub api: bool,
    pub scene: Option<String>,
    pub seed: Option<u64>,
    pub assets_dir: String,
    pub api_addr: String,
    pub nearest_filter: bool,
}

impl LaunchOptions {
    /// Resolve `args` (without the program name) against the environment
    /// lookup `env` and the startup file.
    pub fn resolve(
        args: &[String],
        config: StartupConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let mut spec_path = None;
        let mut headless = false;
        let mut watch = false;
        let mut api = true;
        let mut scene = None;
        let mut seed_arg = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--headless" => headless = true,
                "--watch" => watch = true,
                "--no-api" => api = false,
                "--scene" => {
                    scene = Some(iter.next().ok_or(ConfigError::MissingValue("--scene"))?.clone())
                }
                "--seed" => {
                    seed_arg = Some(iter.next().ok_or(ConfigError::MissingValue("--seed"))?.clone())
                }
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnknownArgument(flag.to_string()))
                }
                path if spec_path.is_none() => spec_path = Some(PathBuf::from(path)),
                extra => return Err(ConfigError::UnknownArgument(extra.to_string())),
            }
        }

        let seed = match seed_arg.or_else(|| var("PLAYSPEC_SEED")) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidSeed(raw.clone()))?,
            ),
            None => config.seed,
        };

        Ok(Self {
            spec_path: spec_path.ok_or(ConfigError::MissingSpecPath)?,
            headless,
            watch,
            api,
            scene: scene.or(config.scene),
            seed,
            assets_dir: var("PLAYSPEC_ASSETS_DIR")
                .or(config.assets_dir)
                .unwrap_or_else(|| DEFAULT_ASSETS_DIR.to_string()),
            api_addr: var("PLAYSPEC_API_ADDR")
                .or(config.api_addr)
                .unwrap_or_else(|| DEFAULT_API_ADDR.to_string()),
            nearest_filter: var("PLAYSPEC_TEXTURE_FILTER")
                .or(config.texture_filter)
                .is_some_and(|v| v.eq_ignore_ascii_case("nearest")),
        })
    }

    pub fn start_options(&self) -> StartOptions {
        StartOptions {
            scene: self.scene.clone(),
            seed: self.seed,
        }
    }

    pub fn load_spec(&self) -> Result<GameSpec, ConfigError> {
        let json = std::fs::read_to_string(&self.spec_path).map_err(|source| ConfigError::Io {
            path: self.spec_path.display().to_string(),
            source,
        })?;
        Ok(GameSpec::from_json(&json)?)
    }
}
