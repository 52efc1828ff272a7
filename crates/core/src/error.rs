use thiserror::Error;

/// Errors raised while loading or validating scheduler configuration.
///
/// Scheduling itself never fails: empty pops and empty dispatches are
/// reported as `None`, not as errors.
#[derive(Error, Debug)]
pub enum WfqError {
    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}
