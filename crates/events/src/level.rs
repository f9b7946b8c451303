use serde::{Deserialize, Serialize};
use tracing::Level;

/// Log levels of the build tool's output, ordered from most to least verbose.
///
/// `Lifecycle` is the default user-facing level; `Quiet` output is shown even
/// when everything else is suppressed.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Lifecycle,
    Warn,
    Quiet,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info | LogLevel::Lifecycle | LogLevel::Quiet => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&LogLevel::Lifecycle).unwrap();
        assert_eq!(json, r#""lifecycle""#);
    }

    #[test]
    fn maps_to_tracing_levels() {
        assert_eq!(Level::from(LogLevel::Quiet), Level::INFO);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }
}
