//! Startup configuration of the keyboard runtime.
//!
//! Everything here is plain data handed to [`crate::keyboard::Keyboard::new`],
//! which validates it before the tick loop starts.

use embassy_time::Duration;

use crate::error::ConfigError;

/// Default number of stable ticks before a switch transition is committed
pub const DEFAULT_DEBOUNCE_TICKS: u8 = 5;
/// Default quadrature transitions per encoder detent
pub const DEFAULT_ENCODER_DIVISOR: u8 = 4;

/// The config struct for the keyboard.
#[derive(Clone, Debug, Default)]
pub struct KeyboardConfig<'a> {
    pub matrix: MatrixConfig<'a>,
    pub encoders: &'a [EncoderConfig],
    pub behavior: BehaviorConfig,
}

/// Direction of the current through the switch diodes.
///
/// It decides which matrix dimension is driven and which one is sensed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiodeOrientation {
    /// Columns are driven, rows are sensed
    #[default]
    ColToRow,
    /// Rows are driven, columns are sensed
    RowToCol,
}

/// Wiring of the switch matrix.
///
/// Pin ids are only used to detect wiring mistakes, the pins themselves are
/// handed to [`crate::matrix::Matrix`].
#[derive(Clone, Debug)]
pub struct MatrixConfig<'a> {
    pub row_pins: &'a [u8],
    pub col_pins: &'a [u8],
    pub diode_orientation: DiodeOrientation,
    pub debounce_ticks: u8,
}

impl Default for MatrixConfig<'_> {
    fn default() -> Self {
        Self {
            row_pins: &[],
            col_pins: &[],
            diode_orientation: DiodeOrientation::ColToRow,
            debounce_ticks: DEFAULT_DEBOUNCE_TICKS,
        }
    }
}

/// Wiring and decoding options of one rotary encoder
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderConfig {
    pub pin_a: Option<u8>,
    pub pin_b: Option<u8>,
    pub button_pin: Option<u8>,
    /// Valid quadrature transitions per emitted step
    pub divisor: u8,
    /// Swap clockwise and counter-clockwise
    pub reverse: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            pin_a: None,
            pin_b: None,
            button_pin: None,
            divisor: DEFAULT_ENCODER_DIVISOR,
            reverse: false,
        }
    }
}

/// Config for timing related behavior
#[derive(Clone, Copy, Debug)]
pub struct BehaviorConfig {
    /// Interval of the polling loop
    pub tick_interval: Duration,
    pub one_shot: OneShotConfig,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1),
            one_shot: OneShotConfig::default(),
        }
    }
}

/// Config for one shot behavior
#[derive(Clone, Copy, Debug)]
pub struct OneShotConfig {
    pub timeout: Duration,
}

impl Default for OneShotConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
        }
    }
}

impl BehaviorConfig {
    /// Number of ticks covering `duration`, rounded up
    pub fn ticks(&self, duration: Duration) -> u32 {
        let interval = self.tick_interval.as_ticks().max(1);
        duration.as_ticks().div_ceil(interval) as u32
    }
}

impl KeyboardConfig<'_> {
    /// Check the wiring of a `ROW` x `COL` matrix with `num_encoder` encoders
    pub fn validate(&self, rows: usize, cols: usize, num_encoder: usize) -> Result<(), ConfigError> {
        let matrix = &self.matrix;
        if matrix.debounce_ticks == 0 {
            return Err(ConfigError::InvalidDebounceTicks);
        }
        if self.behavior.tick_interval.as_ticks() == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        // Pin tables are optional, but must describe the whole matrix when given
        if !matrix.row_pins.is_empty() && matrix.row_pins.len() != rows {
            return Err(ConfigError::RowPinCount {
                expected: rows,
                actual: matrix.row_pins.len(),
            });
        }
        if !matrix.col_pins.is_empty() && matrix.col_pins.len() != cols {
            return Err(ConfigError::ColPinCount {
                expected: cols,
                actual: matrix.col_pins.len(),
            });
        }
        if self.encoders.len() != num_encoder {
            return Err(ConfigError::EncoderCount {
                expected: num_encoder,
                actual: self.encoders.len(),
            });
        }
        for (i, encoder) in self.encoders.iter().enumerate() {
            if encoder.divisor == 0 {
                return Err(ConfigError::InvalidEncoderDivisor { encoder: i });
            }
        }

        // Every pin may drive or sense a single line
        let mut used = [false; 256];
        let encoder_pins = self
            .encoders
            .iter()
            .flat_map(|e| [e.pin_a, e.pin_b, e.button_pin])
            .flatten();
        for pin in matrix.row_pins.iter().chain(matrix.col_pins.iter()).copied().chain(encoder_pins) {
            if used[pin as usize] {
                return Err(ConfigError::DuplicatePin(pin));
            }
            used[pin as usize] = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(KeyboardConfig::default().validate(3, 3, 0), Ok(()));
    }

    #[test]
    fn test_duplicate_pins() {
        let config = KeyboardConfig {
            matrix: MatrixConfig {
                row_pins: &[26, 27, 28],
                col_pins: &[1, 2, 27],
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.validate(3, 3, 0), Err(ConfigError::DuplicatePin(27)));

        let encoders = [EncoderConfig {
            pin_a: Some(0),
            pin_b: Some(4),
            ..Default::default()
        }];
        let config = KeyboardConfig {
            matrix: MatrixConfig {
                row_pins: &[26, 27, 28],
                col_pins: &[1, 2, 4],
                ..Default::default()
            },
            encoders: &encoders,
            ..Default::default()
        };
        assert_eq!(config.validate(3, 3, 1), Err(ConfigError::DuplicatePin(4)));
    }

    #[test]
    fn test_pin_count_and_encoders() {
        let config = KeyboardConfig {
            matrix: MatrixConfig {
                row_pins: &[26, 27],
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.validate(3, 3, 0),
            Err(ConfigError::RowPinCount { expected: 3, actual: 2 })
        );

        let encoders = [EncoderConfig {
            divisor: 0,
            ..Default::default()
        }];
        let config = KeyboardConfig {
            encoders: &encoders,
            ..Default::default()
        };
        assert_eq!(config.validate(3, 3, 1), Err(ConfigError::InvalidEncoderDivisor { encoder: 0 }));
        assert_eq!(
            KeyboardConfig::default().validate(3, 3, 1),
            Err(ConfigError::EncoderCount { expected: 1, actual: 0 })
        );
    }

    #[test]
    fn test_ticks_round_up() {
        let behavior = BehaviorConfig {
            tick_interval: Duration::from_millis(5),
            ..Default::default()
        };
        assert_eq!(behavior.ticks(Duration::from_secs(1)), 200);
        assert_eq!(behavior.ticks(Duration::from_millis(12)), 3);
        assert_eq!(BehaviorConfig::default().ticks(Duration::from_secs(1)), 1000);
    }
}
