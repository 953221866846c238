//! Keymap bindings.
//!
//! Every position of every layer is bound to exactly one [`KeymapEntry`]. The
//! set of entries is closed: configuration is resolved into these values once
//! at startup and never re-interpreted afterwards.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;
use crate::modifier::ModifierCombination;

/// Max number of strokes in one macro
pub const MACRO_MAX_LEN: usize = 16;

/// Strokes of a macro, played in order
pub type MacroSequence = Vec<Stroke, MACRO_MAX_LEN>;

/// A key together with the modifiers held while it is down.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stroke {
    pub key: KeyCode,
    pub modifiers: ModifierCombination,
}

impl Stroke {
    pub const fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: ModifierCombination::new(),
        }
    }

    pub const fn with_modifiers(key: KeyCode, modifiers: ModifierCombination) -> Self {
        Self { key, modifiers }
    }

    /// Keycodes pressed for this stroke, modifiers first.
    ///
    /// Returns the keycode buffer and the number of valid entries in it.
    pub fn keycodes(&self) -> ([KeyCode; 5], usize) {
        let (modifiers, n) = self.modifiers.to_modifier_keycodes();
        let mut keycodes = [KeyCode::No; 5];
        keycodes[..n].copy_from_slice(&modifiers[..n]);
        let mut len = n;
        if self.key != KeyCode::No {
            keycodes[len] = self.key;
            len += 1;
        }
        (keycodes, len)
    }
}

/// How long an activated layer stays on the layer stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayerMode {
    /// Active while the key is held
    Momentary,
    /// Flipped on every press
    Toggle,
    /// Active until the next non-layer key is tapped, or until timeout
    OneShot,
    /// Replaces every active layer except the base layer
    To,
}

/// The action bound to a position of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeymapEntry {
    /// Unbound. On upper layers the lookup falls through to the layers below.
    #[default]
    NoOp,
    /// Press/release a key with its modifiers
    EmitKey(Stroke),
    /// Change the layer stack
    ActivateLayer(u8, LayerMode),
    /// Tap a sequence of strokes on press
    RunMacro(MacroSequence),
}

impl KeymapEntry {
    /// Build a macro entry, `None` if there are more than [`MACRO_MAX_LEN`] strokes.
    pub fn run_macro(strokes: &[Stroke]) -> Option<Self> {
        let mut sequence = MacroSequence::new();
        for stroke in strokes {
            sequence.push(*stroke).ok()?;
        }
        Some(KeymapEntry::RunMacro(sequence))
    }

    pub fn is_no_op(&self) -> bool {
        matches!(self, KeymapEntry::NoOp)
    }

    /// The layer this entry activates, if it is a layer entry
    pub fn layer(&self) -> Option<u8> {
        match self {
            KeymapEntry::ActivateLayer(layer, _) => Some(*layer),
            _ => None,
        }
    }
}

/// Actions of one encoder on one layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderAction {
    counter_clockwise: KeymapEntry,
    clockwise: KeymapEntry,
    button: KeymapEntry,
}

impl EncoderAction {
    pub const fn new(counter_clockwise: KeymapEntry, clockwise: KeymapEntry, button: KeymapEntry) -> Self {
        Self {
            counter_clockwise,
            clockwise,
            button,
        }
    }

    pub fn counter_clockwise(&self) -> &KeymapEntry {
        &self.counter_clockwise
    }

    pub fn clockwise(&self) -> &KeymapEntry {
        &self.clockwise
    }

    pub fn button(&self) -> &KeymapEntry {
        &self.button
    }

    pub(crate) fn entries(&self) -> [&KeymapEntry; 3] {
        [&self.counter_clockwise, &self.clockwise, &self.button]
    }

    /// Layers referenced by any of the three entries
    pub fn layers(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries().into_iter().filter_map(KeymapEntry::layer)
    }
}
