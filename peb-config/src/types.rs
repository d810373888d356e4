//! Small enum types used by configuration sections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Initial window geometry.
///
/// Serialized as `maximized`, `fullscreen`, or `<width>x<height>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WindowSize {
    #[default]
    Maximized,
    Fullscreen,
    Fixed { width: u32, height: u32 },
}

impl WindowSize {
    /// Fixed sizes at or below this edge length are ignored by the window
    /// manager and the window opens maximized instead.
    pub const MIN_FIXED_EDGE: u32 = 100;

    /// Returns the fixed size when it is large enough to be honoured.
    pub fn fixed_size(&self) -> Option<(u32, u32)> {
        match *self {
            WindowSize::Fixed { width, height }
                if width > Self::MIN_FIXED_EDGE && height > Self::MIN_FIXED_EDGE =>
            {
                Some((width, height))
            }
            _ => None,
        }
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowSize::Maximized => write!(f, "maximized"),
            WindowSize::Fullscreen => write!(f, "fullscreen"),
            WindowSize::Fixed { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

impl FromStr for WindowSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maximized" => Ok(WindowSize::Maximized),
            "fullscreen" => Ok(WindowSize::Fullscreen),
            other => {
                let (w, h) = other
                    .split_once('x')
                    .ok_or_else(|| format!("invalid window size '{s}'"))?;
                let width = w
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid window width in '{s}'"))?;
                let height = h
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid window height in '{s}'"))?;
                Ok(WindowSize::Fixed { width, height })
            }
        }
    }
}

impl TryFrom<String> for WindowSize {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WindowSize> for String {
    fn from(value: WindowSize) -> Self {
        value.to_string()
    }
}

/// Where log records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    /// No log file is written.
    #[default]
    None,
    /// All sessions append to `<prefix>.log`.
    SingleFile,
    /// Every session gets its own timestamped `<prefix>-<stamp>.log`.
    PerSession,
}

/// Log verbosity, mirrored onto `log::LevelFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_size_parses_keywords_and_dimensions() {
        assert_eq!("maximized".parse(), Ok(WindowSize::Maximized));
        assert_eq!("FullScreen".parse(), Ok(WindowSize::Fullscreen));
        assert_eq!(
            "1024x768".parse(),
            Ok(WindowSize::Fixed {
                width: 1024,
                height: 768
            })
        );
        assert!("wide".parse::<WindowSize>().is_err());
    }

    #[test]
    fn tiny_fixed_size_is_not_honoured() {
        let size = WindowSize::Fixed {
            width: 90,
            height: 600,
        };
        assert_eq!(size.fixed_size(), None);
        let size = WindowSize::Fixed {
            width: 800,
            height: 600,
        };
        assert_eq!(size.fixed_size(), Some((800, 600)));
    }
}
