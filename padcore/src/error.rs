use core::fmt;

/// Errors found while validating the configuration at startup.
///
/// The keyboard refuses to start on any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The number of row pins doesn't match the matrix rows
    RowPinCount { expected: usize, actual: usize },
    /// The number of column pins doesn't match the matrix columns
    ColPinCount { expected: usize, actual: usize },
    /// The same pin is wired to more than one line
    DuplicatePin(u8),
    /// Debounce needs at least one tick
    InvalidDebounceTicks,
    /// Polling interval must be non-zero
    InvalidTickInterval,
    /// Encoder divisor must be non-zero
    InvalidEncoderDivisor { encoder: usize },
    /// The number of encoder configs doesn't match the keymap
    EncoderCount { expected: usize, actual: usize },
    /// Too many layers for a `u8` layer index
    TooManyLayers(usize),
    /// The number of layers doesn't match the keymap
    LayerCount { expected: usize, actual: usize },
    /// A layer has the wrong number of entries
    LayerLength { layer: usize, expected: usize, actual: usize },
    /// A layer's encoder map has the wrong number of encoders
    EncoderMapLength { layer: usize, expected: usize, actual: usize },
    /// Every position of the base layer must be bound
    UnboundBaseKey { row: u8, col: u8 },
    /// A binding refers to a layer that doesn't exist
    InvalidLayer { layer: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::RowPinCount { expected, actual } => {
                write!(f, "expected {} row pins, got {}", expected, actual)
            }
            ConfigError::ColPinCount { expected, actual } => {
                write!(f, "expected {} column pins, got {}", expected, actual)
            }
            ConfigError::DuplicatePin(pin) => write!(f, "pin {} is used more than once", pin),
            ConfigError::InvalidDebounceTicks => write!(f, "debounce ticks must be at least 1"),
            ConfigError::InvalidTickInterval => write!(f, "tick interval must be non-zero"),
            ConfigError::InvalidEncoderDivisor { encoder } => {
                write!(f, "encoder {} has a zero divisor", encoder)
            }
            ConfigError::EncoderCount { expected, actual } => {
                write!(f, "expected {} encoder configs, got {}", expected, actual)
            }
            ConfigError::TooManyLayers(n) => write!(f, "{} layers exceed the maximum of 256", n),
            ConfigError::LayerCount { expected, actual } => {
                write!(f, "expected {} layers, got {}", expected, actual)
            }
            ConfigError::LayerLength {
                layer,
                expected,
                actual,
            } => write!(f, "layer {} has {} entries, expected {}", layer, actual, expected),
            ConfigError::EncoderMapLength {
                layer,
                expected,
                actual,
            } => write!(
                f,
                "encoder map of layer {} has {} entries, expected {}",
                layer, actual, expected
            ),
            ConfigError::UnboundBaseKey { row, col } => {
                write!(f, "position ({}, {}) is unbound on the base layer", row, col)
            }
            ConfigError::InvalidLayer { layer } => write!(f, "layer {} doesn't exist", layer),
        }
    }
}

impl core::error::Error for ConfigError {}
