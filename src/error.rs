use thiserror::Error;

/// Errors surfaced by [`Sentinel`](crate::Sentinel).
#[derive(Debug, Error)]
pub enum SentinelError {
    /// The host document rejected a rule or style-sheet operation. The host's
    /// own error is kept as the source, untranslated.
    #[error("host rejected operation: {0}")]
    Host(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl SentinelError {
    pub fn host<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SentinelError::Host(Box::new(err))
    }

    /// The host error, if this is one of type `E`.
    pub fn host_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            SentinelError::Host(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}
