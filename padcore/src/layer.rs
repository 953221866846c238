//! The stack of active layers.
//!
//! The base layer 0 is the permanent bottom entry. Every other entry records
//! how it was activated, so that it can be removed by the matching event:
//! the release of the key holding it, a second toggle, a consumed or timed
//! out one-shot, or a `To` switch.
//!
//! When a removal leaves a layer directly on top of itself the two entries
//! are merged, and the merged entry stays until all of its owners are gone.

use heapless::Vec;

use crate::event::InputPos;
use crate::types::action::LayerMode;

/// Max number of stacked layers, base layer included
pub const MAX_LAYER_DEPTH: usize = 8;

/// Max number of activations merged into one stack entry
pub const MAX_LAYER_OWNERS: usize = 8;

/// How a stacked layer got activated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayerEntryKind {
    Base,
    /// Momentary layer, owned by the input holding it
    Held(InputPos),
    Toggled,
    OneShot,
    /// Activated by a `To` switch
    Switched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerEntry {
    pub layer: u8,
    /// Activations keeping this entry on the stack, oldest first
    owners: Vec<LayerEntryKind, MAX_LAYER_OWNERS>,
}

impl LayerEntry {
    fn new(layer: u8, kind: LayerEntryKind) -> Self {
        let mut owners = Vec::new();
        let _ = owners.push(kind);
        Self { layer, owners }
    }

    /// The activation that pushed this entry
    pub fn kind(&self) -> LayerEntryKind {
        self.owners.first().copied().unwrap_or(LayerEntryKind::Base)
    }

    pub fn owners(&self) -> &[LayerEntryKind] {
        &self.owners
    }

    pub fn is_owned_by(&self, kind: LayerEntryKind) -> bool {
        self.owners.contains(&kind)
    }

    fn disown(&mut self, kind: LayerEntryKind) {
        self.owners.retain(|owner| *owner != kind);
    }
}

/// State machine of the one-shot layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OneShotState {
    /// One shot inactive
    #[default]
    None,
    /// Activated at tick `since`, waiting for the next key
    Pending { layer: u8, since: u32 },
    /// The next key was pressed, the layer goes away when it is released
    Consumed { layer: u8, by: InputPos },
}

pub struct LayerStack {
    entries: Vec<LayerEntry, MAX_LAYER_DEPTH>,
    one_shot: OneShotState,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    pub fn new() -> Self {
        let mut entries = Vec::new();
        let _ = entries.push(LayerEntry::new(0, LayerEntryKind::Base));
        Self {
            entries,
            one_shot: OneShotState::None,
        }
    }

    /// Highest priority layer
    pub fn top(&self) -> u8 {
        self.entries.last().map_or(0, |e| e.layer)
    }

    /// Number of stacked entries, base layer included
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Stacked layers, top first
    pub fn layers(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.iter().rev().map(|e| e.layer)
    }

    pub fn entries(&self) -> &[LayerEntry] {
        &self.entries
    }

    pub fn is_active(&self, layer: u8) -> bool {
        self.entries.iter().any(|e| e.layer == layer)
    }

    pub fn one_shot(&self) -> OneShotState {
        self.one_shot
    }

    /// Apply the press of a layer key, returns whether the stacked layers changed.
    ///
    /// `holder` owns a momentary layer, `tick` starts the one-shot timeout.
    pub fn activate(&mut self, layer: u8, mode: LayerMode, holder: InputPos, tick: u32) -> bool {
        let before = self.layer_list();
        match mode {
            LayerMode::Momentary => {
                self.push(layer, LayerEntryKind::Held(holder));
            }
            LayerMode::Toggle => {
                match self
                    .entries
                    .iter()
                    .position(|e| e.layer == layer && e.is_owned_by(LayerEntryKind::Toggled))
                {
                    Some(idx) => self.disown_at(idx, LayerEntryKind::Toggled),
                    None => {
                        self.push(layer, LayerEntryKind::Toggled);
                    }
                }
            }
            LayerMode::OneShot => {
                // A new one-shot replaces the pending one
                self.remove_one_shot();
                if self.push(layer, LayerEntryKind::OneShot) {
                    self.one_shot = OneShotState::Pending { layer, since: tick };
                }
            }
            LayerMode::To => {
                self.entries.truncate(1);
                self.entries[0] = LayerEntry::new(0, LayerEntryKind::Base);
                self.one_shot = OneShotState::None;
                if layer != 0 {
                    self.push(layer, LayerEntryKind::Switched);
                }
            }
        }
        self.layer_list() != before
    }

    /// Drop the momentary activation owned by `holder`, returns whether the stacked layers changed.
    pub fn release(&mut self, holder: InputPos) -> bool {
        let owner = LayerEntryKind::Held(holder);
        match self.entries.iter().rposition(|e| e.is_owned_by(owner)) {
            Some(idx) => {
                let before = self.layer_list();
                self.disown_at(idx, owner);
                self.layer_list() != before
            }
            None => false,
        }
    }

    /// A non-layer key was pressed, it consumes a pending one-shot
    pub fn on_key_press(&mut self, pos: InputPos) {
        if let OneShotState::Pending { layer, .. } = self.one_shot {
            debug!("One-shot layer {} consumed", layer);
            self.one_shot = OneShotState::Consumed { layer, by: pos };
        }
    }

    /// A non-layer key was released, returns whether the stacked layers changed.
    ///
    /// The release of the key that consumed the one-shot removes it.
    pub fn on_key_release(&mut self, pos: InputPos) -> bool {
        match self.one_shot {
            OneShotState::Consumed { by, .. } if by == pos => self.remove_one_shot(),
            _ => false,
        }
    }

    /// Drop a pending one-shot activated `timeout_ticks` or more ticks before `tick`.
    ///
    /// Returns whether the stacked layers changed.
    pub fn expire(&mut self, tick: u32, timeout_ticks: u32) -> bool {
        match self.one_shot {
            OneShotState::Pending { layer, since } if tick.wrapping_sub(since) >= timeout_ticks => {
                debug!("One-shot layer {} timed out", layer);
                self.remove_one_shot()
            }
            _ => false,
        }
    }

    fn layer_list(&self) -> Vec<u8, MAX_LAYER_DEPTH> {
        self.entries.iter().map(|e| e.layer).collect()
    }

    fn push(&mut self, layer: u8, kind: LayerEntryKind) -> bool {
        if layer == self.top() {
            debug!("Layer {} is already on top, ignoring", layer);
            return false;
        }
        if self.entries.push(LayerEntry::new(layer, kind)).is_err() {
            warn!("Layer stack is full, ignoring layer {}", layer);
            return false;
        }
        true
    }

    fn remove_one_shot(&mut self) -> bool {
        self.one_shot = OneShotState::None;
        match self
            .entries
            .iter()
            .rposition(|e| e.is_owned_by(LayerEntryKind::OneShot))
        {
            Some(idx) => {
                let before = self.layer_list();
                self.disown_at(idx, LayerEntryKind::OneShot);
                self.layer_list() != before
            }
            None => false,
        }
    }

    /// Drop one owner of the entry at `idx`, the entry goes once it has none left
    fn disown_at(&mut self, idx: usize, kind: LayerEntryKind) {
        // The base entry is never removed
        if idx == 0 || idx >= self.entries.len() {
            if let Some(entry) = self.entries.get_mut(idx) {
                entry.disown(kind);
            }
            return;
        }
        self.entries[idx].disown(kind);
        if !self.entries[idx].owners.is_empty() {
            return;
        }
        self.entries.remove(idx);

        // Removing an entry may leave a layer directly on top of itself
        let mut i = 1;
        while i < self.entries.len() {
            if self.entries[i].layer == self.entries[i - 1].layer {
                let merged = self.entries.remove(i);
                for owner in merged.owners {
                    if self.entries[i - 1].owners.push(owner).is_err() {
                        warn!("Too many activations of layer {}, dropping {:?}", merged.layer, owner);
                    }
                }
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MatrixPosition;

    fn key(row: u8, col: u8) -> InputPos {
        InputPos::Key(MatrixPosition::new(row, col))
    }

    fn layers(stack: &LayerStack) -> std::vec::Vec<u8> {
        stack.layers().collect()
    }

    #[test]
    fn test_momentary_is_balanced() {
        let mut stack = LayerStack::new();
        assert!(stack.activate(1, LayerMode::Momentary, key(0, 0), 0));
        assert!(stack.activate(2, LayerMode::Momentary, key(0, 1), 0));
        assert_eq!(layers(&stack), [2, 1, 0]);

        // Releasing out of order removes exactly the owned entry
        assert!(stack.release(key(0, 0)));
        assert_eq!(layers(&stack), [2, 0]);
        assert!(!stack.release(key(0, 0)));
        assert!(stack.release(key(0, 1)));
        assert_eq!(layers(&stack), [0]);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_refused_pushes() {
        let mut stack = LayerStack::new();
        assert!(!stack.activate(0, LayerMode::Momentary, key(0, 0), 0));
        assert!(stack.activate(1, LayerMode::Momentary, key(0, 0), 0));
        assert!(!stack.activate(1, LayerMode::Momentary, key(0, 1), 0));
        assert!(!stack.release(key(0, 1)));
        assert_eq!(layers(&stack), [1, 0]);

        let mut stack = LayerStack::new();
        for i in 1..MAX_LAYER_DEPTH as u8 {
            assert!(stack.activate(i, LayerMode::Toggle, key(0, 0), 0));
        }
        assert_eq!(stack.depth(), MAX_LAYER_DEPTH);
        assert!(!stack.activate(9, LayerMode::Toggle, key(0, 0), 0));
        assert_eq!(stack.top(), MAX_LAYER_DEPTH as u8 - 1);
    }

    #[test]
    fn test_toggle() {
        let mut stack = LayerStack::new();
        assert!(stack.activate(2, LayerMode::Toggle, key(1, 1), 0));
        assert!(stack.activate(1, LayerMode::Momentary, key(0, 0), 0));
        // Toggling off a buried layer
        assert!(stack.activate(2, LayerMode::Toggle, key(1, 1), 0));
        assert_eq!(layers(&stack), [1, 0]);
        assert!(stack.release(key(0, 0)));
        assert_eq!(stack.top(), 0);
    }

    #[test]
    fn test_removal_collapses_duplicates() {
        let mut stack = LayerStack::new();
        stack.activate(1, LayerMode::Toggle, key(0, 0), 0);
        stack.activate(2, LayerMode::Momentary, key(0, 1), 0);
        stack.activate(1, LayerMode::Momentary, key(0, 2), 0);
        assert_eq!(layers(&stack), [1, 2, 1, 0]);
        assert!(stack.release(key(0, 1)));
        assert_eq!(layers(&stack), [1, 0]);
        assert_eq!(
            stack.entries()[1].owners(),
            [LayerEntryKind::Toggled, LayerEntryKind::Held(key(0, 2))]
        );

        // Still toggled after the holder is released
        assert!(!stack.release(key(0, 2)));
        assert_eq!(layers(&stack), [1, 0]);
        assert!(stack.activate(1, LayerMode::Toggle, key(0, 0), 0));
        assert_eq!(layers(&stack), [0]);
    }

    #[test]
    fn test_merged_layer_kept_until_every_holder_released() {
        let mut stack = LayerStack::new();
        stack.activate(1, LayerMode::Momentary, key(0, 0), 0);
        stack.activate(2, LayerMode::Toggle, key(1, 0), 0);
        stack.activate(1, LayerMode::Momentary, key(0, 1), 0);
        assert_eq!(layers(&stack), [1, 2, 1, 0]);

        assert!(stack.activate(2, LayerMode::Toggle, key(1, 0), 0));
        assert_eq!(layers(&stack), [1, 0]);
        assert_eq!(stack.entries()[1].kind(), LayerEntryKind::Held(key(0, 0)));

        assert!(!stack.release(key(0, 0)));
        assert_eq!(stack.top(), 1);
        assert!(stack.entries()[1].is_owned_by(LayerEntryKind::Held(key(0, 1))));
        assert!(stack.release(key(0, 1)));
        assert_eq!(layers(&stack), [0]);
    }

    #[test]
    fn test_to_clears_stack() {
        let mut stack = LayerStack::new();
        stack.activate(1, LayerMode::Toggle, key(0, 0), 0);
        stack.activate(2, LayerMode::OneShot, key(0, 1), 0);
        assert!(stack.activate(3, LayerMode::To, key(0, 2), 0));
        assert_eq!(layers(&stack), [3, 0]);
        assert_eq!(stack.one_shot(), OneShotState::None);
        assert!(!stack.activate(3, LayerMode::To, key(0, 2), 0));
        assert!(stack.activate(0, LayerMode::To, key(0, 2), 0));
        assert_eq!(layers(&stack), [0]);
    }

    #[test]
    fn test_one_shot_consumed_by_next_key() {
        let mut stack = LayerStack::new();
        assert!(stack.activate(2, LayerMode::OneShot, key(0, 0), 10));
        stack.on_key_press(key(1, 1));
        assert_eq!(stack.one_shot(), OneShotState::Consumed { layer: 2, by: key(1, 1) });
        // Consumed one-shots don't time out
        assert!(!stack.expire(5000, 100));
        assert!(!stack.on_key_release(key(2, 2)));
        assert!(stack.on_key_release(key(1, 1)));
        assert_eq!(layers(&stack), [0]);
    }

    #[test]
    fn test_one_shot_timeout_is_inclusive() {
        let mut stack = LayerStack::new();
        stack.activate(1, LayerMode::OneShot, key(0, 0), 10);
        assert!(!stack.expire(109, 100));
        assert_eq!(stack.top(), 1);
        assert!(stack.expire(110, 100));
        assert_eq!(stack.top(), 0);
        assert_eq!(stack.one_shot(), OneShotState::None);
    }

    #[test]
    fn test_one_shot_replaced() {
        let mut stack = LayerStack::new();
        stack.activate(1, LayerMode::OneShot, key(0, 0), 0);
        assert!(stack.activate(2, LayerMode::OneShot, key(0, 1), 7));
        assert_eq!(layers(&stack), [2, 0]);
        assert_eq!(stack.one_shot(), OneShotState::Pending { layer: 2, since: 7 });
    }
}
