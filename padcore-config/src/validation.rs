//! Centralized validation for keyboard configuration
//!
//! Structural checks that don't need the key actions to be parsed. Errors in
//! the key actions themselves are reported by [`crate::layout`].

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};
use crate::KeyboardTomlConfig;

/// Max number of layers the runtime can address
pub const MAX_LAYERS: usize = 256;

/// Validates the entire keyboard configuration
pub fn validate_config(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    validate_keyboard_section(config)?;
    validate_matrix_section(config)?;
    validate_encoder_section(config)?;
    validate_pins(config)?;
    validate_layout_section(config)?;
    validate_behavior_section(config)?;
    Ok(())
}

/// Validates the [keyboard] section
fn validate_keyboard_section(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    let keyboard = config.get_keyboard_info()?;
    if keyboard.name.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "keyboard.name".to_string(),
            message: "Keyboard name must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Validates the [matrix] section
fn validate_matrix_section(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    let matrix = config.get_matrix_config()?;
    if matrix.row_pins.is_empty() || matrix.col_pins.is_empty() {
        return Err(ConfigError::Validation {
            field: "matrix".to_string(),
            message: "`row_pins` and `col_pins` must not be empty".to_string(),
        });
    }
    if matrix.debounce_ticks == 0 {
        return Err(ConfigError::OutOfRange {
            field: "matrix.debounce_ticks".to_string(),
            value: "0".to_string(),
            range: "1 to 255".to_string(),
        });
    }
    Ok(())
}

/// Validates the [[encoder]] sections
fn validate_encoder_section(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    for (id, encoder) in config.get_encoders().iter().enumerate() {
        if encoder.divisor == 0 {
            return Err(ConfigError::OutOfRange {
                field: format!("encoder[{}].divisor", id),
                value: "0".to_string(),
                range: "1 to 127".to_string(),
            });
        }
        if encoder.divisor > i8::MAX as u8 {
            return Err(ConfigError::OutOfRange {
                field: format!("encoder[{}].divisor", id),
                value: encoder.divisor.to_string(),
                range: "1 to 127".to_string(),
            });
        }
    }
    Ok(())
}

/// Every pin is wired to exactly one line
fn validate_pins(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    let matrix = config.get_matrix_config()?;
    let mut used: HashMap<u8, String> = HashMap::new();
    let mut claim = |pin: u8, owner: String| -> ConfigResult<()> {
        if let Some(previous) = used.insert(pin, owner.clone()) {
            return Err(ConfigError::Validation {
                field: owner,
                message: format!("Pin {} is already used by {}", pin, previous),
            });
        }
        Ok(())
    };

    for (i, pin) in matrix.row_pins.iter().enumerate() {
        claim(*pin, format!("matrix.row_pins[{}]", i))?;
    }
    for (i, pin) in matrix.col_pins.iter().enumerate() {
        claim(*pin, format!("matrix.col_pins[{}]", i))?;
    }
    for (id, encoder) in config.get_encoders().iter().enumerate() {
        claim(encoder.pin_a, format!("encoder[{}].pin_a", id))?;
        claim(encoder.pin_b, format!("encoder[{}].pin_b", id))?;
        if let Some(pin) = encoder.btn_pin {
            claim(pin, format!("encoder[{}].btn_pin", id))?;
        }
    }
    Ok(())
}

/// Validates the [layout] section and its relation to [matrix] and [[layer]]
fn validate_layout_section(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    let layout = config.layout.as_ref().ok_or(ConfigError::MissingSection {
        section: "layout".to_string(),
    })?;
    let matrix = config.get_matrix_config()?;

    if layout.rows as usize != matrix.row_pins.len() {
        return Err(ConfigError::Validation {
            field: "layout.rows".to_string(),
            message: format!(
                "layout.rows ({}) doesn't match the number of matrix.row_pins ({})",
                layout.rows,
                matrix.row_pins.len()
            ),
        });
    }
    if layout.cols as usize != matrix.col_pins.len() {
        return Err(ConfigError::Validation {
            field: "layout.cols".to_string(),
            message: format!(
                "layout.cols ({}) doesn't match the number of matrix.col_pins ({})",
                layout.cols,
                matrix.col_pins.len()
            ),
        });
    }
    if layout.layers == 0 {
        return Err(ConfigError::OutOfRange {
            field: "layout.layers".to_string(),
            value: "0".to_string(),
            range: format!("1 to {}", MAX_LAYERS - 1),
        });
    }

    let layers = config.layer.as_deref().unwrap_or_default();
    if layers.len() > layout.layers as usize {
        return Err(ConfigError::Validation {
            field: "layout.layers".to_string(),
            message: format!(
                "Number of [[layer]] entries ({}) exceeds layout.layers ({})",
                layers.len(),
                layout.layers
            ),
        });
    }
    let num_encoder = config.get_encoders().len();
    for (i, layer) in layers.iter().enumerate() {
        if layer.encoders.len() > num_encoder {
            return Err(ConfigError::Validation {
                field: format!("layer[{}].encoders", i),
                message: format!(
                    "{} encoder actions are defined but the keyboard has {} encoders",
                    layer.encoders.len(),
                    num_encoder
                ),
            });
        }
    }

    if let Some(aliases) = &config.aliases {
        for key in aliases.keys() {
            if key.is_empty() || key.chars().any(char::is_whitespace) {
                return Err(ConfigError::Validation {
                    field: "aliases".to_string(),
                    message: format!("Alias key '{}' must not be empty or contain whitespace characters", key),
                });
            }
        }
    }

    Ok(())
}

/// Validates the [behavior] section
fn validate_behavior_section(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    let behavior = config.get_behavior_config();
    if behavior.tick_interval_ms == 0 {
        return Err(ConfigError::OutOfRange {
            field: "behavior.tick_interval_ms".to_string(),
            value: "0".to_string(),
            range: "a positive number of milliseconds".to_string(),
        });
    }
    Ok(())
}
