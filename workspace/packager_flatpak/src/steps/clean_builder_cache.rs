use crate::build_pipeline::{BuildError, BuildStep};
use log::info;
use std::{fs, io::ErrorKind, path::PathBuf};
use types::config::BuildConfig;

/// Removes flatpak-builder's state directory. A missing directory counts as
/// already clean.
#[derive(Debug, Clone)]
pub struct CleanBuilderCache {
    state_dir: PathBuf,
}

impl CleanBuilderCache {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        CleanBuilderCache {
            state_dir: state_dir.into(),
        }
    }
}

impl From<&BuildConfig> for CleanBuilderCache {
    fn from(config: &BuildConfig) -> Self {
        CleanBuilderCache::new(&config.state_dir)
    }
}

impl BuildStep for CleanBuilderCache {
    fn step(&self) -> Result<(), BuildError> {
        match fs::remove_dir_all(&self.state_dir) {
            Ok(()) => {
                info!("Removed builder cache {:?}", self.state_dir);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
