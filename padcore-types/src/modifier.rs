use core::ops::BitOr;

use bitfield_struct::bitfield;
use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;

/// A set of modifiers held together with a key, e.g. the `LCtrl` in `LCtrl(C)`.
///
/// | bit4 | bit3 | bit2 | bit1 | bit0 |
/// | --- | --- | --- | --- | --- |
/// | L/R | GUI | ALT |SHIFT| CTRL|
#[bitfield(u8, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Serialize, Deserialize, Eq, PartialEq)]
pub struct ModifierCombination {
    #[bits(1)]
    pub ctrl: bool,
    #[bits(1)]
    pub shift: bool,
    #[bits(1)]
    pub alt: bool,
    #[bits(1)]
    pub gui: bool,
    /// Use the right-hand modifier keys
    #[bits(1)]
    pub right: bool,
    #[bits(3)]
    _reserved: u8,
}

impl BitOr for ModifierCombination {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() | rhs.into_bits())
    }
}

pub const CTRL: ModifierCombination = ModifierCombination::new().with_ctrl(true);
pub const SHIFT: ModifierCombination = ModifierCombination::new().with_shift(true);
pub const ALT: ModifierCombination = ModifierCombination::new().with_alt(true);
pub const GUI: ModifierCombination = ModifierCombination::new().with_gui(true);
pub const RIGHT: ModifierCombination = ModifierCombination::new().with_right(true);

impl ModifierCombination {
    pub const fn new_from(right: bool, gui: bool, alt: bool, shift: bool, ctrl: bool) -> Self {
        ModifierCombination::new()
            .with_right(right)
            .with_gui(gui)
            .with_alt(alt)
            .with_shift(shift)
            .with_ctrl(ctrl)
    }

    pub fn is_empty(self) -> bool {
        !(self.ctrl() || self.shift() || self.alt() || self.gui())
    }

    /// Modifier keycodes in press order: ctrl, shift, alt, gui.
    ///
    /// Returns the keycode buffer and the number of valid entries in it.
    pub fn to_modifier_keycodes(self) -> ([KeyCode; 4], usize) {
        let (ctrl, shift, alt, gui) = if self.right() {
            (KeyCode::RCtrl, KeyCode::RShift, KeyCode::RAlt, KeyCode::RGui)
        } else {
            (KeyCode::LCtrl, KeyCode::LShift, KeyCode::LAlt, KeyCode::LGui)
        };
        let mut keycodes = [KeyCode::No; 4];
        let mut n = 0;
        for (enabled, keycode) in [(self.ctrl(), ctrl), (self.shift(), shift), (self.alt(), alt), (self.gui(), gui)] {
            if enabled {
                keycodes[n] = keycode;
                n += 1;
            }
        }
        (keycodes, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_keycodes_order() {
        let (keycodes, n) = (SHIFT | CTRL | GUI).to_modifier_keycodes();
        assert_eq!(&keycodes[..n], &[KeyCode::LCtrl, KeyCode::LShift, KeyCode::LGui]);

        let (keycodes, n) = (ALT | RIGHT).to_modifier_keycodes();
        assert_eq!(&keycodes[..n], &[KeyCode::RAlt]);

        let (_, n) = ModifierCombination::new().to_modifier_keycodes();
        assert_eq!(n, 0);
        assert!(RIGHT.is_empty());
    }
}
