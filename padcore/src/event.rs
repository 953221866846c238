//! Events flowing through the tick pipeline.

use crate::types::keycode::KeyCode;

/// Position of a switch in the matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MatrixPosition {
    pub row: u8,
    pub col: u8,
}

impl MatrixPosition {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// Whether an input went down or came back up
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Press,
    Release,
}

impl Edge {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed { Edge::Press } else { Edge::Release }
    }
}

/// A committed transition of a matrix switch
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub pos: MatrixPosition,
    pub edge: Edge,
}

impl KeyEvent {
    pub const fn new(row: u8, col: u8, edge: Edge) -> Self {
        Self {
            pos: MatrixPosition::new(row, col),
            edge,
        }
    }
}

/// Rotation direction of an encoder detent
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// Output of the encoder decoder
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncoderEvent {
    /// One full detent
    Step { id: u8, direction: Direction },
    /// Debounced push button transition
    Button { id: u8, edge: Edge },
}

/// Identity of an input source.
///
/// Held keys and momentary layers are tracked per source, so a release is
/// always matched with the press of the same source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputPos {
    Key(MatrixPosition),
    Encoder { id: u8, direction: Direction },
    EncoderButton(u8),
}

/// A physical input transition, ready to be resolved against the keymap
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputEvent {
    pub pos: InputPos,
    pub edge: Edge,
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        Self {
            pos: InputPos::Key(event.pos),
            edge: event.edge,
        }
    }
}

/// What the runtime hands over to the transport and status collaborators
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    /// The layer stack changed, carries the new top layer
    LayerChanged(u8),
}
