//! # padcore-config
//!
//! Loads a `keyboard.toml` describing the wiring, the encoders, the layers and
//! the behavior of a padcore keyboard, validates it and turns the layers into
//! the [`KeymapEntry`] tables the runtime consumes.
//!
//! ```toml
//! [keyboard]
//! name = "macropad"
//!
//! [matrix]
//! row_pins = [26, 27, 28]
//! col_pins = [1, 2, 4]
//! diode = "col2row"
//!
//! [layout]
//! rows = 3
//! cols = 3
//! layers = 1
//!
//! [[layer]]
//! name = "base"
//! keys = "LCtrl(C) LCtrl(V) LCtrl(X) A B C D E MACRO(C A L C)"
//! ```
//!
//! [`KeymapEntry`]: padcore_types::action::KeymapEntry

use std::collections::HashMap;
use std::path::Path;

use serde_derive::Deserialize;
use serde_inline_default::serde_inline_default;

pub mod error;
pub mod layout;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use layout::LayoutConfig;

/// Content of a `keyboard.toml`
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyboardTomlConfig {
    /// Basic info of the keyboard
    pub keyboard: Option<KeyboardInfo>,
    /// Matrix wiring
    pub matrix: Option<MatrixConfig>,
    /// Layout of the keymap
    pub layout: Option<LayoutTomlConfig>,
    /// Keys of each layer
    pub layer: Option<Vec<LayerTomlConfig>>,
    /// Rotary encoders, in encoder id order
    pub encoder: Option<Vec<EncoderConfig>>,
    /// Timing of the tick loop and the layer behaviors
    #[serde(default)]
    pub behavior: BehaviorConfig,
    /// Aliases, referenced as `@name` in layer keys
    pub aliases: Option<HashMap<String, String>>,
}

impl KeyboardTomlConfig {
    /// Read, parse and validate the `keyboard.toml` at `config_toml_path`
    pub fn new_from_toml_path<P: AsRef<Path>>(config_toml_path: P) -> ConfigResult<Self> {
        let path = config_toml_path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse and validate a `keyboard.toml` held in memory
    pub fn new_from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, "keyboard.toml")
    }

    fn parse(content: &str, path: &str) -> ConfigResult<Self> {
        let config = toml::from_str::<KeyboardTomlConfig>(content).map_err(|e| ConfigError::Toml {
            path: path.to_string(),
            message: e.message().to_string(),
        })?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    pub fn get_keyboard_info(&self) -> ConfigResult<&KeyboardInfo> {
        self.keyboard.as_ref().ok_or(ConfigError::MissingSection {
            section: "keyboard".to_string(),
        })
    }

    pub fn get_matrix_config(&self) -> ConfigResult<&MatrixConfig> {
        self.matrix.as_ref().ok_or(ConfigError::MissingSection {
            section: "matrix".to_string(),
        })
    }

    /// Encoders in id order, empty if the keyboard has none
    pub fn get_encoders(&self) -> &[EncoderConfig] {
        self.encoder.as_deref().unwrap_or_default()
    }

    pub fn get_behavior_config(&self) -> &BehaviorConfig {
        &self.behavior
    }
}

/// Configurations for keyboard info
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyboardInfo {
    /// Keyboard name
    pub name: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[allow(non_camel_case_types)]
pub enum DiodeOrientation {
    /// Columns are driven, rows are sensed
    #[default]
    col2row,
    /// Rows are driven, columns are sensed
    row2col,
}

/// Matrix wiring. Pins are GPIO numbers.
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixConfig {
    pub row_pins: Vec<u8>,
    pub col_pins: Vec<u8>,
    #[serde(default)]
    pub diode: DiodeOrientation,
    /// Consecutive ticks a changed reading must persist before it's committed
    #[serde_inline_default(5)]
    pub debounce_ticks: u8,
}

/// Configurations for keyboard layout
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutTomlConfig {
    pub rows: u8,
    pub cols: u8,
    pub layers: u8,
    /// Order of the keys in `[[layer]].keys`, as `(row, col)` coordinates.
    /// Row-major order is used when it's not set.
    pub matrix_map: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerTomlConfig {
    pub name: Option<String>,
    pub keys: String,
    /// Encoder actions of this layer, in encoder id order
    #[serde(default)]
    pub encoders: Vec<EncoderActionTomlConfig>,
}

/// Actions of one encoder on one layer
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderActionTomlConfig {
    #[serde_inline_default("No".to_string())]
    pub ccw: String,
    #[serde_inline_default("No".to_string())]
    pub cw: String,
    #[serde_inline_default("No".to_string())]
    pub button: String,
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderConfig {
    pub pin_a: u8,
    pub pin_b: u8,
    pub btn_pin: Option<u8>,
    /// Quadrature transitions per detent
    #[serde_inline_default(4)]
    pub divisor: u8,
    /// Swap clockwise and counter-clockwise
    #[serde_inline_default(false)]
    pub reverse: bool,
}

/// Timing of the tick loop and the layer behaviors
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorConfig {
    #[serde_inline_default(1)]
    pub tick_interval_ms: u64,
    /// A pending one-shot layer is dropped after this long without a key press
    #[serde_inline_default(1000)]
    pub one_shot_timeout_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1,
            one_shot_timeout_ms: 1000,
        }
    }
}
