use flatpak::execute::ExecuteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    ExecuteError(#[from] ExecuteError),
}

pub trait BuildStep {
    fn step(&self) -> Result<(), BuildError>;
}
