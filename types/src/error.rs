use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("unknown pass status: {0}")]
    UnknownStatus(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("UTC offset out of range: {0} minutes")]
    InvalidOffset(i32),
}
