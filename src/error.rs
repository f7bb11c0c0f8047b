use thiserror::Error;

/// Everything that can stop a simulation or post-processing run.
#[derive(Debug, Error)]
pub enum Error {
    /// Inconsistent input, detected before any photon is launched
    #[error("{rule}; {remedy}")]
    Validation { rule: String, remedy: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("photon database: {0}")]
    Database(#[from] binrw::Error),

    #[error("configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("metadata: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("array shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(rule: impl Into<String>, remedy: impl Into<String>) -> Self {
        Error::Validation { rule: rule.into(), remedy: remedy.into() }
    }
}

/// Fail with a validation error unless `condition` holds
macro_rules! ensure {
    ($condition:expr, $rule:expr, $remedy:expr $(,)?) => {
        if !$condition {
            log::debug!("validation failed: {}", $rule);
            return Err($crate::Error::validation($rule, $remedy))
        }
    };
}

pub(crate) use ensure;
