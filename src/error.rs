use std::fmt;

/// The five error kinds from the error-handling design: only `Fatal` should
/// ever abort an overall pipeline run; the others are recorded and the
/// pipeline continues.
#[derive(thiserror::Error, Debug)]
pub enum ForecastError {
    #[error("transient I/O: {0}")]
    TransientIo(String),

    #[error("parse error in {context}: {detail}")]
    Parse { context: String, detail: String },

    #[error("insufficient state: {0}")]
    State(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("user error: {0}")]
    User(String),
}

impl ForecastError {
    pub fn parse(context: impl Into<String>, detail: impl fmt::Display) -> Self {
        ForecastError::Parse {
            context: context.into(),
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;
