use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("viewer count must be between 1 and {max}, got {given}")]
    InvalidViewerCount { given: usize, max: usize },
}
