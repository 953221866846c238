//! Turns input events into the ordered output event stream.

use heapless::LinearMap;

use crate::channel::{EventSink, OutputQueue};
use crate::event::{Edge, InputEvent, InputPos, OutputEvent};
use crate::keymap::Keymap;
use crate::layer::LayerStack;
use crate::types::action::{KeymapEntry, LayerMode, Stroke};

/// Max number of inputs held down at the same time
pub const HELD_KEYS_MAX: usize = 16;

/// What a held input did on press, replayed in reverse on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Held {
    Key(Stroke),
    /// Macros are complete on press
    Macro,
    Layer(LayerMode),
    /// Bound to nothing, the release is silent
    Nothing,
}

pub struct Dispatcher {
    /// Held inputs and what their press emitted
    held: LinearMap<InputPos, Held, HELD_KEYS_MAX>,
    queue: OutputQueue,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            held: LinearMap::new(),
            queue: OutputQueue::new(),
        }
    }

    pub fn held(&self, pos: InputPos) -> Option<Held> {
        self.held.get(&pos).copied()
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Resolve and process one input event.
    pub fn process<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>(
        &mut self,
        event: InputEvent,
        keymap: &Keymap<ROW, COL, NUM_LAYER, NUM_ENCODER>,
        stack: &mut LayerStack,
        tick: u32,
        sink: &mut impl EventSink,
    ) {
        match event.edge {
            Edge::Press => self.press(event.pos, keymap, stack, tick, sink),
            Edge::Release => self.release(event.pos, stack, sink),
        }
    }

    /// Drop a timed out one-shot layer
    pub fn expire(&mut self, stack: &mut LayerStack, tick: u32, timeout_ticks: u32, sink: &mut impl EventSink) {
        if stack.expire(tick, timeout_ticks) {
            self.layer_changed(stack, sink);
        }
    }

    /// Hand the queued events over to `sink`
    pub fn flush(&mut self, sink: &mut impl EventSink) {
        self.queue.flush(sink);
    }

    fn press<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>(
        &mut self,
        pos: InputPos,
        keymap: &Keymap<ROW, COL, NUM_LAYER, NUM_ENCODER>,
        stack: &mut LayerStack,
        tick: u32,
        sink: &mut impl EventSink,
    ) {
        if self.held.contains_key(&pos) {
            warn!("{:?} is already held, dropping press", pos);
            return;
        }
        // The release must be able to undo whatever the press does
        if self.held.len() == HELD_KEYS_MAX {
            warn!("Held keys are full, dropping press of {:?}", pos);
            return;
        }

        let held = match keymap.resolve_input(pos, Edge::Press, stack) {
            KeymapEntry::EmitKey(stroke) => {
                stack.on_key_press(pos);
                self.press_stroke(stroke, sink);
                Held::Key(*stroke)
            }
            KeymapEntry::RunMacro(strokes) => {
                stack.on_key_press(pos);
                debug!("Run macro of {} strokes", strokes.len());
                for stroke in strokes.iter() {
                    self.press_stroke(stroke, sink);
                    self.release_stroke(stroke, sink);
                }
                Held::Macro
            }
            KeymapEntry::ActivateLayer(layer, mode) => {
                if stack.activate(*layer, *mode, pos, tick) {
                    self.layer_changed(stack, sink);
                }
                Held::Layer(*mode)
            }
            KeymapEntry::NoOp => Held::Nothing,
        };
        let _ = self.held.insert(pos, held);
    }

    fn release(&mut self, pos: InputPos, stack: &mut LayerStack, sink: &mut impl EventSink) {
        let Some(held) = self.held.remove(&pos) else {
            warn!("Release of {:?} without press, dropping", pos);
            return;
        };
        let changed = match held {
            Held::Key(stroke) => {
                self.release_stroke(&stroke, sink);
                stack.on_key_release(pos)
            }
            Held::Macro => stack.on_key_release(pos),
            Held::Layer(LayerMode::Momentary) => stack.release(pos),
            Held::Layer(_) | Held::Nothing => false,
        };
        if changed {
            self.layer_changed(stack, sink);
        }
    }

    /// Modifiers first, then the key
    fn press_stroke(&mut self, stroke: &Stroke, sink: &mut impl EventSink) {
        let (keycodes, n) = stroke.keycodes();
        for keycode in &keycodes[..n] {
            self.queue.send(OutputEvent::KeyDown(*keycode), sink);
        }
    }

    /// Reverse order of `press_stroke`
    fn release_stroke(&mut self, stroke: &Stroke, sink: &mut impl EventSink) {
        let (keycodes, n) = stroke.keycodes();
        for keycode in keycodes[..n].iter().rev() {
            self.queue.send(OutputEvent::KeyUp(*keycode), sink);
        }
    }

    fn layer_changed(&mut self, stack: &LayerStack, sink: &mut impl EventSink) {
        let top = stack.top();
        debug!("Layer changed, top: {}", top);
        self.queue.send(OutputEvent::LayerChanged(top), sink);
    }
}
