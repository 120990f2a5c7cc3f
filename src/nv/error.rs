#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NvError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("input ended before a required field")]
    ShortRead,

    #[error("bad magic: {0}")]
    BadMagic(String),

    #[error("failed to parse group {0}: {1}")]
    GroupParse(String, String),

    #[error("cannot write file without a profile")]
    MissingProfile,

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid container: {0}")]
    Invalid(String),
}

pub type NvResult<T> = Result<T, NvError>;
