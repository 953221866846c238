pub mod test_macro;

use embassy_time::Duration;
use padcore::channel::EventSink;
use padcore::config::{
    BehaviorConfig, DiodeOrientation, EncoderConfig, KeyboardConfig, MatrixConfig, OneShotConfig,
};
use padcore::encoder::EncoderLines;
use padcore::event::{Direction, OutputEvent};
use padcore::keyboard::Keyboard;
use padcore::keymap::Keymap;
use padcore::types::action::{EncoderAction, KeymapEntry};
use padcore::{a, encoder, k, mac, to, wm};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const DEBOUNCE_TICKS: u8 = 5;

/// Collects every output event
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<OutputEvent>,
}

impl EventSink for RecordingSink {
    fn consume(&mut self, event: OutputEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone)]
pub struct TestKeyPress {
    pub row: u8,
    pub col: u8,
    pub pressed: bool,
    pub delay: u32, // Ticks to run before this key changes
}

/// A keyboard driven by simulated readings, one `tick()` at a time
pub struct TestKeyboard<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize> {
    pub keyboard: Keyboard<'static, ROW, COL, NUM_LAYER, NUM_ENCODER>,
    pub readings: [[bool; COL]; ROW],
    pub encoder_lines: [EncoderLines; NUM_ENCODER],
    pub sink: RecordingSink,
    debounce_ticks: u8,
}

impl<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>
    TestKeyboard<ROW, COL, NUM_LAYER, NUM_ENCODER>
{
    pub fn new(keymap: Keymap<ROW, COL, NUM_LAYER, NUM_ENCODER>, config: KeyboardConfig<'static>) -> Self {
        // Box::leak is acceptable in tests
        let keymap = Box::leak(Box::new(keymap));
        let debounce_ticks = config.matrix.debounce_ticks;
        Self {
            keyboard: Keyboard::new(keymap, &config).unwrap(),
            readings: [[false; COL]; ROW],
            encoder_lines: [EncoderLines::default(); NUM_ENCODER],
            sink: RecordingSink::default(),
            debounce_ticks,
        }
    }

    pub fn tick(&mut self) {
        let lines = self.encoder_lines.map(Some);
        self.keyboard.tick(&self.readings, &lines, &mut self.sink);
    }

    pub fn ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Ticks needed for a change to be committed
    pub fn settle(&mut self) {
        self.ticks(self.debounce_ticks as u32);
    }

    pub fn press(&mut self, row: usize, col: usize) {
        self.readings[row][col] = true;
        self.settle();
    }

    pub fn release(&mut self, row: usize, col: usize) {
        self.readings[row][col] = false;
        self.settle();
    }

    /// Walk encoder `id` through one full detent, one phase per tick
    pub fn turn(&mut self, id: usize, direction: Direction) {
        let phases: [(bool, bool); 4] = match direction {
            Direction::Clockwise => [(false, true), (true, true), (true, false), (false, false)],
            Direction::CounterClockwise => [(true, false), (true, true), (false, true), (false, false)],
        };
        for (a, b) in phases {
            self.encoder_lines[id].a = a;
            self.encoder_lines[id].b = b;
            self.tick();
        }
    }

    pub fn take_events(&mut self) -> Vec<OutputEvent> {
        core::mem::take(&mut self.sink.events)
    }
}

/// Run a key sequence and return every output event, in order
pub fn run_key_sequence_test<const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>(
    keyboard: &mut TestKeyboard<ROW, COL, NUM_LAYER, NUM_ENCODER>,
    key_sequence: &[TestKeyPress],
) -> Vec<OutputEvent> {
    for key in key_sequence {
        keyboard.ticks(key.delay);
        keyboard.readings[key.row as usize][key.col as usize] = key.pressed;
    }
    keyboard.settle();
    keyboard.take_events()
}

/// Config of the 3x3 macropad: col2row matrix, one encoder without button
pub fn macropad_config() -> KeyboardConfig<'static> {
    static ENCODERS: [EncoderConfig; 1] = [EncoderConfig {
        pin_a: Some(0),
        pin_b: Some(29),
        button_pin: None,
        divisor: 4,
        reverse: false,
    }];
    KeyboardConfig {
        matrix: MatrixConfig {
            row_pins: &[26, 27, 28],
            col_pins: &[1, 2, 4],
            diode_orientation: DiodeOrientation::ColToRow,
            debounce_ticks: DEBOUNCE_TICKS,
        },
        encoders: &ENCODERS,
        behavior: BehaviorConfig::default(),
    }
}

pub fn config_with_one_shot_timeout(timeout: Duration, debounce_ticks: u8) -> KeyboardConfig<'static> {
    KeyboardConfig {
        matrix: MatrixConfig {
            debounce_ticks,
            ..Default::default()
        },
        behavior: BehaviorConfig {
            tick_interval: Duration::from_millis(1),
            one_shot: OneShotConfig { timeout },
        },
        ..Default::default()
    }
}

/// Productivity, gaming, media and soundboard layers, the encoder cycles through them
#[rustfmt::skip]
pub fn macropad_keymap() -> Keymap<3, 3, 4, 1> {
    let layers: [[[KeymapEntry; 3]; 3]; 4] = [
        [
            [wm!(C, CTRL), wm!(V, CTRL), wm!(X, CTRL)],
            [wm!(Z, CTRL), wm!(S, CTRL), wm!(A, CTRL)],
            [wm!(F, CTRL), wm!(T, CTRL), wm!(W, CTRL)],
        ],
        [
            [k!(F5), k!(F9), k!(F12)],
            [k!(Tab), k!(M), k!(Space)],
            [k!(LCtrl), k!(R), k!(E)],
        ],
        [
            [k!(MediaPlayPause), k!(MediaNextTrack), k!(MediaPrevTrack)],
            [k!(AudioVolDown), k!(AudioMute), k!(AudioVolUp)],
            [k!(MediaStop), mac!(C, A, L, C), a!(NoOp)],
        ],
        [
            [k!(F13), k!(F14), k!(F15)],
            [k!(F16), k!(F17), k!(F18)],
            [k!(F19), k!(F20), k!(F21)],
        ],
    ];
    let encoders: [[EncoderAction; 1]; 4] = [
        [encoder!(to!(3), to!(1), a!(NoOp))],
        [encoder!(to!(0), to!(2), a!(NoOp))],
        [encoder!(to!(1), to!(3), a!(NoOp))],
        [encoder!(to!(2), to!(0), a!(NoOp))],
    ];
    Keymap::new(layers, encoders).unwrap()
}

pub fn create_macropad() -> TestKeyboard<3, 3, 4, 1> {
    TestKeyboard::new(macropad_keymap(), macropad_config())
}
