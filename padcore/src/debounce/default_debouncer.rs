use super::{DebounceState, DebouncerTrait, SwitchState};

/// Per-key debouncer that defers a change until the reading has been stable
/// for `ticks` consecutive scans.
pub struct DefaultDebouncer<const ROW: usize, const COL: usize> {
    ticks: u8,
    states: [[SwitchState; COL]; ROW],
}

impl<const ROW: usize, const COL: usize> DefaultDebouncer<ROW, COL> {
    pub fn new(ticks: u8) -> Self {
        DefaultDebouncer {
            ticks: ticks.max(1),
            states: [[SwitchState::Released; COL]; ROW],
        }
    }

    pub fn state(&self, row_idx: usize, col_idx: usize) -> SwitchState {
        self.states[row_idx][col_idx]
    }
}

impl<const ROW: usize, const COL: usize> Default for DefaultDebouncer<ROW, COL> {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DEBOUNCE_TICKS)
    }
}

impl<const ROW: usize, const COL: usize> DebouncerTrait<ROW, COL> for DefaultDebouncer<ROW, COL> {
    fn detect_change_with_debounce(&mut self, row_idx: usize, col_idx: usize, pin_state: bool) -> DebounceState {
        self.states[row_idx][col_idx].update(pin_state, self.ticks)
    }

    fn is_pressed(&self, row_idx: usize, col_idx: usize) -> bool {
        self.states[row_idx][col_idx].is_pressed()
    }
}
