//! Per-key debouncing of raw switch readings.
//!
//! Debouncers count polling ticks rather than wall-clock time, so the result
//! of a scan only depends on the sequence of readings.

pub mod default_debouncer;

pub trait DebouncerTrait<const ROW: usize, const COL: usize> {
    /// Feed the raw reading of a key, returns whether its committed state changed.
    fn detect_change_with_debounce(&mut self, row_idx: usize, col_idx: usize, pin_state: bool) -> DebounceState;

    /// Committed state of a key
    fn is_pressed(&self, row_idx: usize, col_idx: usize) -> bool;
}

/// Debounce state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    /// The committed state flipped
    Debounced,
    InProgress,
    /// Raw reading agrees with the committed state
    Ignored,
}

/// Debounce state machine of a single switch.
///
/// The payload of the `Debouncing*` states is the number of consecutive ticks
/// the raw reading has disagreed with the committed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SwitchState {
    #[default]
    Released,
    DebouncingPress(u8),
    Pressed,
    DebouncingRelease(u8),
}

impl SwitchState {
    /// Committed state, `Debouncing*` states report what was last committed
    pub fn is_pressed(&self) -> bool {
        matches!(self, SwitchState::Pressed | SwitchState::DebouncingRelease(_))
    }

    /// Advance by one tick with the raw reading `raw`.
    ///
    /// The change is committed on the `threshold`-th consecutive disagreeing
    /// reading. A reading that agrees with the committed state discards the count.
    pub fn update(&mut self, raw: bool, threshold: u8) -> DebounceState {
        let committed = self.is_pressed();
        if raw == committed {
            // Stable, or a reversal during debouncing
            *self = if committed { SwitchState::Pressed } else { SwitchState::Released };
            return DebounceState::Ignored;
        }

        let count = match *self {
            SwitchState::DebouncingPress(n) | SwitchState::DebouncingRelease(n) => n.saturating_add(1),
            _ => 1,
        };
        if count >= threshold {
            *self = if raw { SwitchState::Pressed } else { SwitchState::Released };
            DebounceState::Debounced
        } else {
            *self = if raw {
                SwitchState::DebouncingPress(count)
            } else {
                SwitchState::DebouncingRelease(count)
            };
            DebounceState::InProgress
        }
    }
}
