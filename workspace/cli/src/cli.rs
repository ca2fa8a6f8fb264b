use super::args::FlatpakRunnerArgs;
use clap::Parser;
use env_logger::Env;
use log::info;
use packager_flatpak::build_pipeline::BuildError;
use packager_flatpak::runner::BuildRunner;
use std::env::{self, VarError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use types::config::{BuildConfig, ConfigError, ConfigFile, RunnerConfig};
use types::defaults::BRANCH_ENV;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    BuildError(#[from] BuildError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error("{0} is not valid UTF-8")]
    NonUnicodeEnv(&'static str),

    #[error("Failed to read current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

type Result<T> = std::result::Result<T, RunnerError>;

/// Parses arguments, runs the build and returns the exit code the process
/// should end with.
pub fn run_cli() -> Result<i32> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = FlatpakRunnerArgs::parse();
    let program_version: &str = env!("CARGO_PKG_VERSION");

    let current_dir = env::current_dir().map_err(RunnerError::CurrentDir)?;
    let config = resolve_config(
        args.config,
        branch_from_env(env::var(BRANCH_ENV))?,
        &current_dir,
        program_version,
    )?;

    let runner = BuildRunner::system(config);
    if args.dry_run {
        println!("{}", runner.invocation());
        return Ok(0);
    }

    Ok(runner.run()?)
}

/// Unset and empty both mean no override; a value that is not UTF-8 is
/// rejected rather than silently dropped.
pub fn branch_from_env(value: std::result::Result<String, VarError>) -> Result<Option<String>> {
    match value {
        Ok(branch) => Ok(Some(branch)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(RunnerError::NonUnicodeEnv(BRANCH_ENV)),
    }
}

/// Picks the build configuration: the explicit `--config` file, else
/// `flatpak-runner.toml` in `search_dir`, else the built-in values. The
/// branch override is applied before validation. Relative paths in an
/// explicit `--config` file are taken relative to that file.
pub fn resolve_config(
    config_path: Option<String>,
    branch: Option<String>,
    search_dir: &Path,
    program_version: &str,
) -> Result<BuildConfig> {
    let explicit = config_path.is_some();
    let config_file = match config_path {
        Some(path) => Some(ConfigFile::<RunnerConfig>::load(Some(path))?),
        None => ConfigFile::<RunnerConfig>::load_optional(search_dir)?,
    };

    let config = match config_file {
        Some(config_file) => {
            let base = match config_file.path.parent() {
                Some(parent) if explicit => parent.to_path_buf(),
                _ => PathBuf::new(),
            };
            let mut runner_config = config_file.parse()?;
            runner_config.build = runner_config.build.with_branch_override(branch);
            runner_config
                .validate_and_apply_defaults(program_version)?
                .relative_to(&base)
        }
        None => {
            info!("No config file found, using built-in defaults");
            BuildConfig::builtin()?
                .with_branch_override(branch)
                .validate()?
        }
    };

    Ok(config)
}
