use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Source error: {0}")]
    Source(String),
}

impl Error {
    /// Whether this error should exit with the configuration status code.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Pattern(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
