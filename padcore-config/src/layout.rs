use std::collections::HashMap;
use std::str::FromStr;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use padcore_types::action::{EncoderAction, KeymapEntry, LayerMode, Stroke, MACRO_MAX_LEN};
use padcore_types::keycode::KeyCode;

use crate::error::{ConfigError, ConfigResult};
use crate::{KeyboardTomlConfig, LayoutTomlConfig};

#[derive(Parser)]
#[grammar = "keymap.pest"]
struct ConfigParser;

// Max alias resolution depth to prevent infinite loops
const MAX_ALIAS_RESOLUTION_DEPTH: usize = 10;

/// Keymap tables resolved from `[layout]` and `[[layer]]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutConfig {
    pub rows: u8,
    pub cols: u8,
    /// One row-major list of `rows * cols` entries per layer
    pub layers: Vec<Vec<KeymapEntry>>,
    /// One list of encoder actions per layer, in encoder id order
    pub encoders: Vec<Vec<EncoderAction>>,
}

impl LayoutConfig {
    /// Layers as slices, the shape `padcore::keymap::Keymap::from_flat` takes
    pub fn layer_slices(&self) -> Vec<&[KeymapEntry]> {
        self.layers.iter().map(Vec::as_slice).collect()
    }

    /// Encoder maps as slices, the shape `padcore::keymap::Keymap::from_flat` takes
    pub fn encoder_slices(&self) -> Vec<&[EncoderAction]> {
        self.encoders.iter().map(Vec::as_slice).collect()
    }
}

impl KeyboardTomlConfig {
    /// Parse every layer into keymap entries.
    ///
    /// Layers declared in `layout.layers` without a `[[layer]]` section are
    /// left unbound, every position of the base layer must be bound.
    pub fn get_layout_config(&self) -> ConfigResult<LayoutConfig> {
        let layout = self.layout.as_ref().ok_or(ConfigError::MissingSection {
            section: "layout".to_string(),
        })?;
        if layout.rows == 0 || layout.cols == 0 || layout.layers == 0 {
            return Err(ConfigError::Validation {
                field: "layout".to_string(),
                message: "rows, cols and layers must be positive".to_string(),
            });
        }
        let aliases = self.aliases.clone().unwrap_or_default();
        let layers = self.layer.as_deref().unwrap_or_default();
        let num_encoder = self.get_encoders().len();
        let sequence_to_grid = Self::sequence_to_grid(layout)?;

        // Collect layer names first, actions can reference later layers
        let mut layer_names = HashMap::<String, u8>::new();
        for (layer_number, layer) in layers.iter().enumerate() {
            if let Some(name) = &layer.name {
                if layer_names.insert(name.clone(), layer_number as u8).is_some() {
                    return Err(ConfigError::Validation {
                        field: "layer.name".to_string(),
                        message: format!("Duplicate layer name '{}'", name),
                    });
                }
            }
        }
        if layers.len() > layout.layers as usize {
            return Err(ConfigError::Validation {
                field: "layout.layers".to_string(),
                message: format!("{} [[layer]] entries are defined but layout.layers is {}", layers.len(), layout.layers),
            });
        }
        let parser = ActionParser {
            aliases: &aliases,
            layer_names: &layer_names,
            num_layers: layout.layers,
        };

        let num_keys = layout.rows as usize * layout.cols as usize;
        let mut final_layers = vec![vec![KeymapEntry::NoOp; num_keys]; layout.layers as usize];
        let mut final_encoders = vec![vec![EncoderAction::default(); num_encoder]; layout.layers as usize];
        for (layer_number, layer) in layers.iter().enumerate() {
            let actions = parser.parse_keys(layer_number, &layer.keys)?;
            if actions.len() > sequence_to_grid.len() {
                return Err(ConfigError::Validation {
                    field: format!("layer[{}].keys", layer_number),
                    message: format!(
                        "{} keys are defined but the layout has {} positions",
                        actions.len(),
                        sequence_to_grid.len()
                    ),
                });
            }
            for (sequence_number, action) in actions.into_iter().enumerate() {
                let (row, col) = sequence_to_grid[sequence_number];
                final_layers[layer_number][row as usize * layout.cols as usize + col as usize] = action;
            }

            if layer.encoders.len() > num_encoder {
                return Err(ConfigError::Validation {
                    field: format!("layer[{}].encoders", layer_number),
                    message: format!("The keyboard has {} encoders", num_encoder),
                });
            }
            for (id, encoder) in layer.encoders.iter().enumerate() {
                final_encoders[layer_number][id] = EncoderAction::new(
                    parser.parse_single(layer_number, &encoder.ccw)?,
                    parser.parse_single(layer_number, &encoder.cw)?,
                    parser.parse_single(layer_number, &encoder.button)?,
                );
            }
        }

        if let Some(index) = final_layers[0].iter().position(KeymapEntry::is_no_op) {
            return Err(ConfigError::Validation {
                field: "layer[0].keys".to_string(),
                message: format!(
                    "Every key of the base layer must be bound, ({}, {}) is not",
                    index / layout.cols as usize,
                    index % layout.cols as usize
                ),
            });
        }

        Ok(LayoutConfig {
            rows: layout.rows,
            cols: layout.cols,
            layers: final_layers,
            encoders: final_encoders,
        })
    }

    /// Position of each entry of `[[layer]].keys` in the grid
    fn sequence_to_grid(layout: &LayoutTomlConfig) -> ConfigResult<Vec<(u8, u8)>> {
        let Some(matrix_map) = &layout.matrix_map else {
            return Ok((0..layout.rows)
                .flat_map(|row| (0..layout.cols).map(move |col| (row, col)))
                .collect());
        };

        let coords = parse_matrix_map(matrix_map).map_err(|message| ConfigError::Validation {
            field: "layout.matrix_map".to_string(),
            message,
        })?;
        let mut seen = vec![vec![false; layout.cols as usize]; layout.rows as usize];
        for (row, col) in &coords {
            if *row >= layout.rows || *col >= layout.cols {
                return Err(ConfigError::Validation {
                    field: "layout.matrix_map".to_string(),
                    message: format!(
                        "Coordinate ({},{}) is out of bounds: ([0..{}], [0..{}]) is the expected range",
                        row,
                        col,
                        layout.rows - 1,
                        layout.cols - 1
                    ),
                });
            }
            if seen[*row as usize][*col as usize] {
                return Err(ConfigError::Validation {
                    field: "layout.matrix_map".to_string(),
                    message: format!("Duplicate coordinate ({},{})", row, col),
                });
            }
            seen[*row as usize][*col as usize] = true;
        }
        Ok(coords)
    }
}

/// Parse `"(0,0) (0,1) ..."` into coordinates
fn parse_matrix_map(matrix_map: &str) -> Result<Vec<(u8, u8)>, String> {
    let pairs = ConfigParser::parse(Rule::matrix_map, matrix_map)
        .map_err(|e| format!("Invalid layout.matrix_map format: {}", e))?;
    let mut coordinates = Vec::new();
    for pair in pairs.flat_map(Pair::into_inner) {
        match pair.as_rule() {
            Rule::coordinate => {
                let mut parts = pair.into_inner();
                let row_str = parts.next().ok_or("Missing row coordinate")?.as_str();
                let col_str = parts.next().ok_or("Missing col coordinate")?.as_str();
                let row = row_str
                    .parse::<u8>()
                    .map_err(|e| format!("Failed to parse row '{}': {}", row_str, e))?;
                let col = col_str
                    .parse::<u8>()
                    .map_err(|e| format!("Failed to parse col '{}': {}", col_str, e))?;
                coordinates.push((row, col));
            }
            Rule::EOI => {}
            rule => return Err(format!("Unexpected rule in layout.matrix_map: {:?}", rule)),
        }
    }
    Ok(coordinates)
}

/// Replace every `@alias` in `keys`, recursively
fn alias_resolver(keys: &str, aliases: &HashMap<String, String>) -> Result<String, String> {
    let mut current_keys = keys.to_string();
    for _ in 0..MAX_ALIAS_RESOLUTION_DEPTH {
        let mut next_keys = String::with_capacity(current_keys.len());
        let mut made_replacement = false;
        let mut rest = current_keys.as_str();
        while let Some(at_index) = rest.find('@') {
            next_keys.push_str(&rest[..at_index]);
            let after = &rest[at_index + 1..];
            // An alias name ends at whitespace or at a bracket of the enclosing action
            let end = after
                .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
                .unwrap_or(after.len());
            if end == 0 {
                // Not an alias, keep the '@'
                next_keys.push('@');
            } else {
                let alias_key = &after[..end];
                let value = aliases
                    .get(alias_key)
                    .ok_or_else(|| format!("Undefined alias: {}", alias_key))?;
                next_keys.push_str(value);
                made_replacement = true;
            }
            rest = &after[end..];
        }
        next_keys.push_str(rest);

        if !made_replacement {
            return Ok(next_keys);
        }
        current_keys = next_keys;
    }
    Err(format!(
        "Alias resolution exceeded maximum depth ({}), potential infinite loop detected in '{}'",
        MAX_ALIAS_RESOLUTION_DEPTH, keys
    ))
}

/// Parses key action strings of one keyboard.toml
struct ActionParser<'a> {
    aliases: &'a HashMap<String, String>,
    layer_names: &'a HashMap<String, u8>,
    num_layers: u8,
}

impl ActionParser<'_> {
    /// Parse a whitespace separated list of actions
    fn parse_keys(&self, layer: usize, keys: &str) -> ConfigResult<Vec<KeymapEntry>> {
        let keys = alias_resolver(keys, self.aliases).map_err(|message| ConfigError::KeyAction {
            layer,
            action: keys.to_string(),
            message,
        })?;
        let pairs = ConfigParser::parse(Rule::key_map, &keys).map_err(|e| ConfigError::KeyAction {
            layer,
            action: keys.clone(),
            message: e.to_string(),
        })?;
        pairs
            .flat_map(Pair::into_inner)
            .filter(|pair| pair.as_rule() != Rule::EOI)
            .map(|pair| {
                let action = pair.as_str().to_string();
                self.parse_action(pair)
                    .map_err(|message| ConfigError::KeyAction { layer, action, message })
            })
            .collect()
    }

    /// Parse a string holding exactly one action
    fn parse_single(&self, layer: usize, action: &str) -> ConfigResult<KeymapEntry> {
        let mut entries = self.parse_keys(layer, action)?;
        if entries.len() != 1 {
            return Err(ConfigError::KeyAction {
                layer,
                action: action.to_string(),
                message: format!("Expected exactly one action, found {}", entries.len()),
            });
        }
        Ok(entries.remove(0))
    }

    fn parse_action(&self, pair: Pair<Rule>) -> Result<KeymapEntry, String> {
        let mode = match pair.as_rule() {
            Rule::no_action => return Ok(KeymapEntry::NoOp),
            Rule::macro_action => return parse_macro(pair),
            Rule::key_stroke => {
                let stroke = parse_stroke(pair)?;
                return Ok(if stroke.key == KeyCode::No && stroke.modifiers.is_empty() {
                    KeymapEntry::NoOp
                } else {
                    KeymapEntry::EmitKey(stroke)
                });
            }
            Rule::mo_action => LayerMode::Momentary,
            Rule::tg_action => LayerMode::Toggle,
            Rule::osl_action => LayerMode::OneShot,
            Rule::to_action => LayerMode::To,
            rule => return Err(format!("Unexpected rule in key list: {:?}", rule)),
        };
        let layer = pair.into_inner().next().ok_or("Missing layer")?;
        Ok(KeymapEntry::ActivateLayer(self.layer_resolver(layer)?, mode))
    }

    /// A layer number or the name of a `[[layer]]`
    fn layer_resolver(&self, pair: Pair<Rule>) -> Result<u8, String> {
        let layer = match pair.as_rule() {
            Rule::layer_number => pair
                .as_str()
                .parse::<u8>()
                .map_err(|e| format!("Failed to parse layer '{}': {}", pair.as_str(), e))?,
            Rule::layer_name => *self
                .layer_names
                .get(pair.as_str())
                .ok_or_else(|| format!("Invalid layer name: {}", pair.as_str()))?,
            rule => return Err(format!("Unexpected rule in layer action: {:?}", rule)),
        };
        if layer >= self.num_layers {
            return Err(format!(
                "Layer {} doesn't exist, layout.layers is {}",
                layer, self.num_layers
            ));
        }
        Ok(layer)
    }
}

fn parse_macro(pair: Pair<Rule>) -> Result<KeymapEntry, String> {
    let strokes = pair.into_inner().map(parse_stroke).collect::<Result<Vec<_>, _>>()?;
    if strokes.is_empty() {
        return Err("MACRO needs at least one key".to_string());
    }
    KeymapEntry::run_macro(&strokes)
        .ok_or_else(|| format!("MACRO has {} keys, at most {} are allowed", strokes.len(), MACRO_MAX_LEN))
}

fn parse_keycode(name: &str) -> Result<KeyCode, String> {
    KeyCode::from_str(name).map_err(|_| format!("Unknown keycode: {}", name))
}

/// Walk a `key_stroke`, every wrapping keycode must be a modifier
fn parse_stroke(pair: Pair<Rule>) -> Result<Stroke, String> {
    let mut inner = pair.into_inner();
    let name = inner.next().ok_or("Missing keycode")?.as_str();
    let key = parse_keycode(name)?;
    let Some(wrapped) = inner.next() else {
        return Ok(Stroke::new(key));
    };
    let modifier = key
        .as_modifier()
        .ok_or_else(|| format!("{} is not a modifier", name))?;
    let inner = parse_stroke(wrapped)?;
    if !inner.modifiers.is_empty() && inner.modifiers.right() != modifier.right() {
        return Err("Left and right modifiers can't be mixed in one key".to_string());
    }
    Ok(Stroke::with_modifiers(inner.key, inner.modifiers | modifier))
}
