use std::error::Error as StdError;
use std::fmt::Display;

///
/// An invalid configuration value, either passed to the
/// [`Builder`](crate::runtime::Builder) or read from the environment.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A time value could not be parsed.
    InvalidTime(String),
    /// A time resolution could not be parsed.
    InvalidUnit(String),
    /// The scheduler backend is unknown.
    UnknownScheduler(String),
    /// The synchronization mode is unknown.
    UnknownSyncMode(String),
    /// An environment variable carried an invalid value.
    Env {
        var: &'static str,
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    pub(crate) fn env(var: &'static str, source: ConfigError) -> ConfigError {
        ConfigError::Env {
            var,
            source: Box::new(source),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTime(s) => write!(f, "invalid time value '{s}'"),
            Self::InvalidUnit(s) => write!(f, "invalid time unit '{s}'"),
            Self::UnknownScheduler(s) => write!(
                f,
                "unknown scheduler '{s}' (expected calendar, heap, map or list)"
            ),
            Self::UnknownSyncMode(s) => write!(
                f,
                "unknown synchronization mode '{s}' (expected best-effort or hard-limit)"
            ),
            Self::Env { var, source } => write!(f, "invalid value of {var}: {source}"),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Env { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_errors_chain_their_source() {
        let err = ConfigError::env("DES_SCHEDULER", ConfigError::UnknownScheduler("fifo".into()));
        assert_eq!(
            err.to_string(),
            "invalid value of DES_SCHEDULER: unknown scheduler 'fifo' (expected calendar, heap, map or list)"
        );
        assert!(err.source().is_some());
        assert!(ConfigError::InvalidTime("x".into()).source().is_none());
    }
}
