use std::{
    env::{self, VarError},
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};

use crate::{error::Error, heuristic::HeuristicRules};

const APP_NAME: &str = "Curate";
const CONFIG_FILENAME: &str = "config.json";
const PROXY_ENV_VAR: &str = "HTTPS_PROXY";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger_url: String,
    pub timeout_secs: u64,
    /// Working playlist of the last session.
    pub playlist: Option<String>,
    pub heuristics: HeuristicRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_url: "http://localhost:8080".to_string(),
            timeout_secs: 5,
            playlist: None,
            heuristics: HeuristicRules::default(),
        }
    }
}

impl Config {
    fn app_dirs() -> Option<AppDirs> {
        const USE_XDG_ON_MACOS: bool = false;

        AppDirs::new(Some(APP_NAME), USE_XDG_ON_MACOS)
    }

    pub fn config_dir() -> Option<PathBuf> {
        Self::app_dirs().map(|dirs| dirs.config_dir)
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILENAME))
    }

    /// Load the config from the platform config dir, `None` if there is none
    /// yet.
    pub fn load() -> Result<Option<Config>, Error> {
        let path = Self::config_path()
            .ok_or_else(|| Error::Config("failed to get config path".to_string()))?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Option<Config>, Error> {
        match File::open(path) {
            Ok(file) => {
                log::info!("loading config: {:?}", path);
                let config = serde_json::from_reader(file)
                    .map_err(|err| Error::Config(format!("failed to read config: {}", err)))?;
                Ok(Some(config))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self) -> Result<(), Error> {
        let path = Self::config_path()
            .ok_or_else(|| Error::Config("failed to get config path".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(dir) = path.parent() {
            mkdir_if_not_exists(dir)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|err| Error::Config(format!("failed to write config: {}", err)))
    }

    pub fn proxy() -> Option<String> {
        env::var(PROXY_ENV_VAR).map_or_else(
            |err| match err {
                VarError::NotPresent => None,
                VarError::NotUnicode(_) => {
                    log::error!("proxy URL is not a valid unicode");
                    None
                }
            },
            Some,
        )
    }
}

pub fn mkdir_if_not_exists(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).or_else(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            Ok(())
        } else {
            Err(err)
        }
    })
}
