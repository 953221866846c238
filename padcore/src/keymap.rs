//! Immutable layer tables and the lookup from an input to its entry.
//!
//! A lookup only reads the keymap and the layer stack, the same input under
//! the same stack always resolves to the same entry.

use crate::error::ConfigError;
use crate::event::{Direction, InputPos, MatrixPosition};
use crate::layer::LayerStack;
use crate::types::action::{EncoderAction, KeymapEntry};

static NO_OP: KeymapEntry = KeymapEntry::NoOp;

/// Keymap represents the bindings of every layer.
///
/// It is built and validated once at startup and never changes afterwards.
/// A lookup walks the layer stack from the top and takes the first layer
/// which binds the position, the base layer binds every position.
pub struct Keymap<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize = 0> {
    layers: [[[KeymapEntry; COL]; ROW]; NUM_LAYER],
    /// Encoder bindings, per layer per encoder
    encoders: [[EncoderAction; NUM_ENCODER]; NUM_LAYER],
}

impl<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>
    Keymap<ROW, COL, NUM_LAYER, NUM_ENCODER>
{
    pub fn new(
        layers: [[[KeymapEntry; COL]; ROW]; NUM_LAYER],
        encoders: [[EncoderAction; NUM_ENCODER]; NUM_LAYER],
    ) -> Result<Self, ConfigError> {
        if NUM_LAYER > u8::MAX as usize + 1 {
            return Err(ConfigError::TooManyLayers(NUM_LAYER));
        }
        if NUM_LAYER == 0 {
            return Err(ConfigError::LayerCount { expected: 1, actual: 0 });
        }

        for (row, line) in layers[0].iter().enumerate() {
            for (col, entry) in line.iter().enumerate() {
                if entry.is_no_op() {
                    return Err(ConfigError::UnboundBaseKey {
                        row: row as u8,
                        col: col as u8,
                    });
                }
            }
        }

        let key_layers = layers.iter().flatten().flatten().filter_map(KeymapEntry::layer);
        let encoder_layers = encoders.iter().flatten().flat_map(EncoderAction::layers);
        for layer in key_layers.chain(encoder_layers) {
            if layer as usize >= NUM_LAYER {
                return Err(ConfigError::InvalidLayer { layer });
            }
        }

        Ok(Self { layers, encoders })
    }

    /// Build a keymap from row-major flattened layers.
    ///
    /// Every layer must have `ROW * COL` entries and every encoder map `NUM_ENCODER` entries.
    pub fn from_flat(layers: &[&[KeymapEntry]], encoders: &[&[EncoderAction]]) -> Result<Self, ConfigError> {
        if layers.len() != NUM_LAYER {
            return Err(ConfigError::LayerCount {
                expected: NUM_LAYER,
                actual: layers.len(),
            });
        }
        for (layer, keys) in layers.iter().enumerate() {
            if keys.len() != ROW * COL {
                return Err(ConfigError::LayerLength {
                    layer,
                    expected: ROW * COL,
                    actual: keys.len(),
                });
            }
        }
        // A missing encoder map is only allowed without encoders
        if !(encoders.is_empty() && NUM_ENCODER == 0) && encoders.len() != NUM_LAYER {
            return Err(ConfigError::LayerCount {
                expected: NUM_LAYER,
                actual: encoders.len(),
            });
        }
        for (layer, actions) in encoders.iter().enumerate() {
            if actions.len() != NUM_ENCODER {
                return Err(ConfigError::EncoderMapLength {
                    layer,
                    expected: NUM_ENCODER,
                    actual: actions.len(),
                });
            }
        }

        let key_map = core::array::from_fn(|layer| {
            core::array::from_fn(|row| core::array::from_fn(|col| layers[layer][row * COL + col].clone()))
        });
        let encoder_map = core::array::from_fn(|layer| {
            core::array::from_fn(|id| {
                encoders
                    .get(layer)
                    .and_then(|actions| actions.get(id))
                    .cloned()
                    .unwrap_or_default()
            })
        });
        Self::new(key_map, encoder_map)
    }

    /// Entry bound to `pos` on the topmost stacked layer which binds it.
    ///
    /// Resolution doesn't depend on `edge`: a release is matched with its
    /// press through the dispatcher's held table.
    pub fn resolve(&self, pos: MatrixPosition, _edge: crate::event::Edge, stack: &LayerStack) -> &KeymapEntry {
        let (row, col) = (pos.row as usize, pos.col as usize);
        if row >= ROW || col >= COL {
            warn!("Key ({}, {}) is out of the matrix", pos.row, pos.col);
            return &NO_OP;
        }
        self.lookup(stack, |layer| self.layers.get(layer as usize).map(|l| &l[row][col]))
    }

    /// Entry bound to an encoder rotation or button, with the same fall-through as keys
    pub fn resolve_encoder(&self, pos: InputPos, stack: &LayerStack) -> &KeymapEntry {
        let (id, select): (u8, fn(&EncoderAction) -> &KeymapEntry) = match pos {
            InputPos::Encoder {
                id,
                direction: Direction::Clockwise,
            } => (id, EncoderAction::clockwise),
            InputPos::Encoder {
                id,
                direction: Direction::CounterClockwise,
            } => (id, EncoderAction::counter_clockwise),
            InputPos::EncoderButton(id) => (id, EncoderAction::button),
            InputPos::Key(_) => return &NO_OP,
        };
        if id as usize >= NUM_ENCODER {
            warn!("Encoder {} is not in the keymap", id);
            return &NO_OP;
        }
        self.lookup(stack, |layer| {
            self.encoders.get(layer as usize).map(|l| select(&l[id as usize]))
        })
    }

    /// Entry bound to any input source
    pub fn resolve_input(&self, pos: InputPos, edge: crate::event::Edge, stack: &LayerStack) -> &KeymapEntry {
        match pos {
            InputPos::Key(key) => self.resolve(key, edge, stack),
            _ => self.resolve_encoder(pos, stack),
        }
    }

    fn lookup<'s>(
        &'s self,
        stack: &LayerStack,
        entry_at: impl Fn(u8) -> Option<&'s KeymapEntry>,
    ) -> &'s KeymapEntry {
        for layer in stack.layers() {
            match entry_at(layer) {
                Some(entry) if !entry.is_no_op() => return entry,
                Some(_) => {}
                None => warn!("Layer {} is not in the keymap", layer),
            }
        }
        entry_at(0).unwrap_or(&NO_OP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Edge;
    use crate::types::action::LayerMode;
    use crate::{a, encoder, k, mo, tg, to};

    fn keymap() -> Keymap<1, 2, 3, 1> {
        Keymap::new(
            [[[k!(A), mo!(1)]], [[k!(B), a!(NoOp)]], [[a!(NoOp), k!(C)]]],
            [
                [encoder!(k!(AudioVolDown), k!(AudioVolUp))],
                [encoder!(a!(NoOp), to!(2))],
                [encoder!(to!(1), a!(NoOp), tg!(2))],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_falls_through() {
        let keymap = keymap();
        let mut stack = LayerStack::new();
        let pos = |col| MatrixPosition::new(0, col);
        assert_eq!(keymap.resolve(pos(0), Edge::Press, &stack), &k!(A));

        stack.activate(1, LayerMode::Toggle, InputPos::Key(pos(1)), 0);
        assert_eq!(keymap.resolve(pos(0), Edge::Press, &stack), &k!(B));
        assert_eq!(keymap.resolve(pos(1), Edge::Press, &stack), &mo!(1));

        stack.activate(2, LayerMode::Toggle, InputPos::Key(pos(1)), 0);
        assert_eq!(keymap.resolve(pos(0), Edge::Press, &stack), &k!(B));
        assert_eq!(keymap.resolve(pos(1), Edge::Release, &stack), &k!(C));
        assert_eq!(keymap.resolve(pos(5), Edge::Press, &stack), &a!(NoOp));
    }

    #[test]
    fn test_resolve_encoder() {
        let keymap = keymap();
        let mut stack = LayerStack::new();
        let cw = InputPos::Encoder {
            id: 0,
            direction: Direction::Clockwise,
        };
        let ccw = InputPos::Encoder {
            id: 0,
            direction: Direction::CounterClockwise,
        };
        assert_eq!(keymap.resolve_encoder(cw, &stack), &k!(AudioVolUp));
        stack.activate(1, LayerMode::To, cw, 0);
        assert_eq!(keymap.resolve_encoder(cw, &stack), &to!(2));
        assert_eq!(keymap.resolve_encoder(ccw, &stack), &k!(AudioVolDown));
        assert_eq!(keymap.resolve_encoder(InputPos::EncoderButton(0), &stack), &a!(NoOp));
        assert_eq!(keymap.resolve_encoder(InputPos::EncoderButton(3), &stack), &a!(NoOp));
    }

    #[test]
    fn test_resolution_is_pure() {
        let keymap = keymap();
        let holder = InputPos::Key(MatrixPosition::new(0, 1));
        let mut stacks = [LayerStack::new(), LayerStack::new(), LayerStack::new(), LayerStack::new()];
        stacks[1].activate(1, LayerMode::Momentary, holder, 0);
        stacks[2].activate(2, LayerMode::Toggle, holder, 0);
        stacks[3].activate(1, LayerMode::Toggle, holder, 0);
        stacks[3].activate(2, LayerMode::OneShot, holder, 0);

        let inputs = [
            InputPos::Key(MatrixPosition::new(0, 0)),
            InputPos::Key(MatrixPosition::new(0, 1)),
            InputPos::Key(MatrixPosition::new(3, 3)),
            InputPos::Encoder {
                id: 0,
                direction: Direction::Clockwise,
            },
            InputPos::Encoder {
                id: 0,
                direction: Direction::CounterClockwise,
            },
            InputPos::EncoderButton(0),
        ];
        for stack in &stacks {
            for pos in inputs {
                let first = keymap.resolve_input(pos, Edge::Press, stack);
                let second = keymap.resolve_input(pos, Edge::Press, stack);
                assert!(core::ptr::eq(first, second), "{:?} resolved twice differently", pos);
                assert_eq!(keymap.resolve_input(pos, Edge::Release, stack), first);
            }
        }
    }

    #[test]
    fn test_validation() {
        let result: Result<Keymap<1, 2, 2, 0>, _> = Keymap::new([[[k!(A), a!(NoOp)]], [[k!(B), k!(C)]]], [[], []]);
        assert_eq!(result.err(), Some(ConfigError::UnboundBaseKey { row: 0, col: 1 }));

        let result: Result<Keymap<1, 1, 2, 0>, _> = Keymap::new([[[tg!(2)]], [[k!(B)]]], [[], []]);
        assert_eq!(result.err(), Some(ConfigError::InvalidLayer { layer: 2 }));

        let result: Result<Keymap<1, 1, 2, 1>, _> =
            Keymap::new([[[k!(A)]], [[k!(B)]]], [[encoder!(to!(3), to!(1))], [encoder!(a!(NoOp), a!(NoOp))]]);
        assert_eq!(result.err(), Some(ConfigError::InvalidLayer { layer: 3 }));
    }

    #[test]
    fn test_from_flat() {
        let base = [k!(A), k!(B), k!(C), k!(D)];
        let upper = [a!(NoOp), k!(E), a!(NoOp), k!(F)];
        let keymap: Keymap<2, 2, 2, 0> = Keymap::from_flat(&[&base, &upper], &[]).unwrap();
        let stack = LayerStack::new();
        assert_eq!(keymap.resolve(MatrixPosition::new(1, 0), Edge::Press, &stack), &k!(C));

        let result: Result<Keymap<2, 2, 2, 0>, _> = Keymap::from_flat(&[&base, &upper[..3]], &[]);
        assert_eq!(
            result.err(),
            Some(ConfigError::LayerLength {
                layer: 1,
                expected: 4,
                actual: 3
            })
        );

        let result: Result<Keymap<2, 2, 1, 1>, _> = Keymap::from_flat(&[&base], &[&[]]);
        assert_eq!(
            result.err(),
            Some(ConfigError::EncoderMapLength {
                layer: 0,
                expected: 1,
                actual: 0
            })
        );
    }
}
