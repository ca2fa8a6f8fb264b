use log::{info, warn};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    cmp::Ordering,
    env, fs,
    io::{self, ErrorKind},
    marker::PhantomData,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    defaults,
    ident::{self, IdentError},
    url::{Url, UrlError},
};

/// Represents the raw configuration file content
#[derive(Debug, Clone)]
pub struct ConfigFile<T> {
    content: Cow<'static, str>,
    _marker: PhantomData<T>,
    pub path: PathBuf,
}

impl<T> AsRef<str> for ConfigFile<T> {
    fn as_ref(&self) -> &str {
        &self.content
    }
}

/// Errors that can occur during configuration handling
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Version parsing error: {0}")]
    VersionParse(#[from] semver::Error),

    #[error("{0}")]
    IncompatibleVersion(String),

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Ident(#[from] IdentError),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Failed to expand manifest path '{0}': {1}")]
    Expand(String, String),
}

pub trait ConfigType {
    fn default_config_path() -> &'static str;
}

impl<T: ConfigType> ConfigFile<T> {
    /// Loads configuration from the specified location or the current directory.
    ///
    /// `config_path` may name the file itself or the directory holding
    /// [`ConfigType::default_config_path`]. A missing file is an error.
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let path = Self::resolve_config_path(config_path)?;
        Self::read(path)
    }

    /// Loads the default config file from `dir` if one exists.
    pub fn load_optional(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(T::default_config_path());
        if !path.is_file() {
            return Ok(None);
        }
        Self::read(path).map(Some)
    }

    fn read(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(ConfigError::Io)?;
        info!("Loaded config {}", path.display());
        Ok(ConfigFile {
            content: Cow::Owned(content),
            _marker: PhantomData,
            path,
        })
    }

    fn resolve_config_path(config_path: Option<String>) -> Result<PathBuf, ConfigError> {
        let path = match config_path {
            Some(location) => {
                let path = PathBuf::from(location);
                if path.is_dir() {
                    path.join(T::default_config_path())
                } else {
                    path
                }
            }
            None => env::current_dir()
                .map_err(ConfigError::Io)?
                .join(T::default_config_path()),
        };

        if !path.exists() {
            return Err(ConfigError::Io(io::Error::new(
                ErrorKind::NotFound,
                format!("Path does not exist: {}", path.display()),
            )));
        }

        Ok(path)
    }

    /// Parses the configuration content into the generic type T
    pub fn parse(self) -> Result<T, ConfigError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        toml::from_str::<T>(&self.content).map_err(ConfigError::from)
    }
}

/// Top level of `flatpak-runner.toml`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Lowest flatpak-runner version the file was written for
    #[serde(default)]
    pub runner_version: Option<Version>,

    pub build: BuildConfig,
}

impl ConfigType for RunnerConfig {
    fn default_config_path() -> &'static str {
        defaults::CONFIG_FILE_NAME
    }
}

impl RunnerConfig {
    /// Checks `runner_version` against the running binary and validates the
    /// build section.
    pub fn validate_and_apply_defaults(
        self,
        current_runner_version: &str,
    ) -> Result<BuildConfig, ConfigError> {
        if let Some(required_version) = &self.runner_version {
            let current_version =
                Version::parse(current_runner_version).map_err(ConfigError::VersionParse)?;

            match required_version.cmp(&current_version) {
                Ordering::Greater => {
                    return Err(ConfigError::IncompatibleVersion(format!(
                        "Required flatpak-runner version {} is higher than current version {}",
                        required_version, current_version
                    )));
                }
                Ordering::Less => {
                    warn!(
                        "Required flatpak-runner version {} is lower than current version {}. This may cause compatibility issues.",
                        required_version, current_version
                    );
                }
                Ordering::Equal => {}
            }
        }

        self.build.validate()
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(defaults::STATE_DIR)
}

fn default_build_dir() -> PathBuf {
    PathBuf::from(defaults::BUILD_DIR)
}

fn default_repo_dir() -> PathBuf {
    PathBuf::from(defaults::REPO_DIR)
}

/// Everything one flatpak-builder run needs. Immutable once validated.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Output bundle file name
    pub bundle: String,

    /// Manifest handed to flatpak-builder
    pub manifest_path: PathBuf,

    /// Module identifier within the manifest
    pub flatpak_module: String,

    pub app_id: String,

    /// Remote repo providing the runtime dependencies
    pub runtime_repo: Url,

    /// Default branch override
    #[serde(default)]
    pub branch: Option<String>,

    /// flatpak-builder cache, removed before and after each build
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,
}

impl BuildConfig {
    /// The values used when no config file is present.
    pub fn builtin() -> Result<Self, ConfigError> {
        Ok(BuildConfig {
            bundle: defaults::BUNDLE.to_string(),
            manifest_path: PathBuf::from(defaults::MANIFEST_PATH),
            flatpak_module: defaults::FLATPAK_MODULE.to_string(),
            app_id: defaults::APP_ID.to_string(),
            runtime_repo: Url::parse(defaults::RUNTIME_REPO)?,
            branch: None,
            state_dir: default_state_dir(),
            build_dir: default_build_dir(),
            repo_dir: default_repo_dir(),
        })
    }

    /// Applies the `BRANCH` override. An empty value counts as unset.
    pub fn with_branch_override(mut self, branch: Option<String>) -> Self {
        if let Some(branch) = branch.filter(|b| !b.is_empty()) {
            info!("Using branch '{}' from {}", branch, defaults::BRANCH_ENV);
            self.branch = Some(branch);
        }
        self
    }

    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.bundle.is_empty() {
            return Err(ConfigError::EmptyField("bundle"));
        }
        if self.flatpak_module.is_empty() {
            return Err(ConfigError::EmptyField("flatpak_module"));
        }
        if self.manifest_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField("manifest_path"));
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField("state_dir"));
        }

        ident::validate_app_id(&self.app_id)?;
        if let Some(branch) = &self.branch {
            ident::validate_branch(branch)?;
        }

        let raw = self.manifest_path.to_string_lossy().into_owned();
        let expanded =
            shellexpand::full(&raw).map_err(|err| ConfigError::Expand(raw.clone(), err.to_string()))?;
        self.manifest_path = PathBuf::from(expanded.into_owned());

        Ok(self)
    }

    /// Resolves relative paths against `base`, the directory of the config
    /// file they were read from. Absolute paths are kept.
    pub fn relative_to(mut self, base: &Path) -> Self {
        if base.as_os_str().is_empty() {
            return self;
        }
        self.manifest_path = base.join(&self.manifest_path);
        self.state_dir = base.join(&self.state_dir);
        self.build_dir = base.join(&self.build_dir);
        self.repo_dir = base.join(&self.repo_dir);
        self
    }

    /// Variables exported into the builder's environment, available to the
    /// manifest through variable substitution.
    pub fn exported_env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("BUNDLE", self.bundle.clone()),
            ("MANIFEST_PATH", self.manifest_path.to_string_lossy().into_owned()),
            ("FLATPAK_MODULE", self.flatpak_module.clone()),
            ("APP_ID", self.app_id.clone()),
            ("RUNTIME_REPO", self.runtime_repo.to_string()),
        ]
    }
}
