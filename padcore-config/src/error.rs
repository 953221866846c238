//! Errors of loading a `keyboard.toml`.
//!
//! Except for I/O and TOML syntax errors, every error names the offending
//! setting by its dotted path, e.g. `matrix.col_pins[1]` or `layer[2].keys`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file couldn't be read
    Read { path: String, message: String },
    /// The file isn't valid TOML, or doesn't match the `keyboard.toml` schema
    Toml { path: String, message: String },
    /// A mandatory section such as `[matrix]` is absent
    MissingSection { section: String },
    /// A numeric setting outside of its allowed range
    OutOfRange { field: String, value: String, range: String },
    /// Settings which contradict each other or the hardware description
    Validation { field: String, message: String },
    /// A key action in `[[layer]]` couldn't be parsed or refers to something undefined
    KeyAction { layer: usize, action: String, message: String },
}

impl ConfigError {
    /// Dotted path of the offending setting
    pub fn field(&self) -> Option<String> {
        match self {
            ConfigError::Read { .. } | ConfigError::Toml { .. } => None,
            ConfigError::MissingSection { section } => Some(section.clone()),
            ConfigError::OutOfRange { field, .. } | ConfigError::Validation { field, .. } => Some(field.clone()),
            ConfigError::KeyAction { layer, .. } => Some(format!("layer[{}].keys", layer)),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, message } => write!(f, "Can't read {}: {}", path, message),
            ConfigError::Toml { path, message } => write!(f, "{}: {}", path, message),
            ConfigError::MissingSection { section } => write!(f, "keyboard.toml: [{}] is required", section),
            ConfigError::OutOfRange { field, value, range } => {
                write!(f, "keyboard.toml: {} is {}, the allowed range is {}", field, value, range)
            }
            ConfigError::Validation { field, message } => write!(f, "keyboard.toml: {}: {}", field, message),
            ConfigError::KeyAction { layer, action, message } => {
                write!(f, "keyboard.toml: layer #{}, `{}`: {}", layer, action, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_the_setting() {
        let error = ConfigError::OutOfRange {
            field: "encoder[0].divisor".to_string(),
            value: "0".to_string(),
            range: "1 to 127".to_string(),
        };
        assert_eq!(error.field().as_deref(), Some("encoder[0].divisor"));
        assert_eq!(
            error.to_string(),
            "keyboard.toml: encoder[0].divisor is 0, the allowed range is 1 to 127"
        );

        let error = ConfigError::KeyAction {
            layer: 2,
            action: "NotAKey".to_string(),
            message: "Unknown keycode: NotAKey".to_string(),
        };
        assert_eq!(error.field().as_deref(), Some("layer[2].keys"));
        assert_eq!(
            ConfigError::MissingSection {
                section: "matrix".to_string()
            }
            .to_string(),
            "keyboard.toml: [matrix] is required"
        );
        assert_eq!(
            ConfigError::Read {
                path: "a.toml".to_string(),
                message: "gone".to_string()
            }
            .field(),
            None
        );
    }
}
