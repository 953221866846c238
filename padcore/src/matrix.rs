//! Switch matrix wiring and the debounced scanner.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;

use crate::config::DiodeOrientation;
use crate::debounce::{DebounceState, DebouncerTrait};
use crate::error::ConfigError;
use crate::event::{Edge, KeyEvent};

/// Max number of driven or sensed lines of a matrix
pub const MATRIX_LINES_MAX: usize = 32;
/// Max number of key events a single scan can produce
pub const SCAN_EVENTS_MAX: usize = 64;

/// Source of raw switch readings, normalized to rows and columns.
pub trait MatrixReader<const ROW: usize, const COL: usize> {
    /// Sample every switch, `true` means the switch is closed.
    fn read(&mut self, readings: &mut [[bool; COL]; ROW]);
}

/// Matrix is the physical pcb layout of the keyboard matrix.
///
/// Output pins are driven high one at a time while the input pins are
/// sampled. Which of rows and columns are outputs depends on the diode
/// orientation:
/// - `ColToRow`: columns are outputs, rows are inputs
/// - `RowToCol`: rows are outputs, columns are inputs
pub struct Matrix<In: InputPin, Out: OutputPin, D: DelayNs, const ROW: usize, const COL: usize> {
    /// Input pins of the pcb matrix
    input_pins: Vec<In, MATRIX_LINES_MAX>,
    /// Output pins of the pcb matrix
    output_pins: Vec<Out, MATRIX_LINES_MAX>,
    /// Settle time after an output line changes
    delay: D,
    orientation: DiodeOrientation,
}

impl<In: InputPin, Out: OutputPin, D: DelayNs, const ROW: usize, const COL: usize> Matrix<In, Out, D, ROW, COL> {
    /// Create a matrix from input and output pins.
    ///
    /// The number of pins must match the `ROW` x `COL` grid for the given orientation.
    pub fn new(
        input_pins: impl IntoIterator<Item = In>,
        output_pins: impl IntoIterator<Item = Out>,
        delay: D,
        orientation: DiodeOrientation,
    ) -> Result<Self, ConfigError> {
        let (input_pins, input_count) = collect_pins(input_pins);
        let (output_pins, output_count) = collect_pins(output_pins);
        let (row_count, col_count) = match orientation {
            DiodeOrientation::ColToRow => (input_count, output_count),
            DiodeOrientation::RowToCol => (output_count, input_count),
        };
        if row_count != ROW {
            return Err(ConfigError::RowPinCount {
                expected: ROW,
                actual: row_count,
            });
        }
        if col_count != COL {
            return Err(ConfigError::ColPinCount {
                expected: COL,
                actual: col_count,
            });
        }
        Ok(Matrix {
            input_pins,
            output_pins,
            delay,
            orientation,
        })
    }
}

fn collect_pins<P>(pins: impl IntoIterator<Item = P>) -> (Vec<P, MATRIX_LINES_MAX>, usize) {
    let mut collected = Vec::new();
    let mut count = 0;
    for pin in pins {
        // Overflowing pins are counted so that the size check reports them
        let _ = collected.push(pin);
        count += 1;
    }
    (collected, count)
}

impl<In: InputPin, Out: OutputPin, D: DelayNs, const ROW: usize, const COL: usize> MatrixReader<ROW, COL>
    for Matrix<In, Out, D, ROW, COL>
{
    fn read(&mut self, readings: &mut [[bool; COL]; ROW]) {
        for (out_idx, out_pin) in self.output_pins.iter_mut().enumerate() {
            // Pull up output pin, wait 1us ensuring the change comes into effect
            out_pin.set_high().ok();
            self.delay.delay_us(1);
            for (in_idx, in_pin) in self.input_pins.iter_mut().enumerate() {
                let (row, col) = match self.orientation {
                    DiodeOrientation::ColToRow => (in_idx, out_idx),
                    DiodeOrientation::RowToCol => (out_idx, in_idx),
                };
                readings[row][col] = in_pin.is_high().unwrap_or(false);
            }
            // Pull it back to low
            out_pin.set_low().ok();
        }
    }
}

/// Turns raw matrix readings into committed key events, one scan per tick.
pub struct Scanner<D: DebouncerTrait<ROW, COL>, const ROW: usize, const COL: usize> {
    debouncer: D,
}

impl<D: DebouncerTrait<ROW, COL>, const ROW: usize, const COL: usize> Scanner<D, ROW, COL> {
    const FITS_SCAN_BATCH: () = assert!(ROW * COL <= SCAN_EVENTS_MAX, "matrix is too large");

    pub fn new(debouncer: D) -> Self {
        let () = Self::FITS_SCAN_BATCH;
        Self { debouncer }
    }

    /// Debounce one full set of readings.
    ///
    /// Events are returned in row-major order.
    pub fn poll(&mut self, readings: &[[bool; COL]; ROW]) -> Vec<KeyEvent, SCAN_EVENTS_MAX> {
        let mut events = Vec::new();
        for (row, line) in readings.iter().enumerate() {
            for (col, &raw) in line.iter().enumerate() {
                if let DebounceState::Debounced = self.debouncer.detect_change_with_debounce(row, col, raw) {
                    let event = KeyEvent::new(row as u8, col as u8, Edge::from_pressed(raw));
                    debug!("Key ({}, {}) {:?}", row, col, event.edge);
                    if events.push(event).is_err() {
                        warn!("Scan batch full, dropping key event");
                    }
                }
            }
        }
        events
    }

    /// Committed state of a key
    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        row < ROW && col < COL && self.debouncer.is_pressed(row, col)
    }
}
