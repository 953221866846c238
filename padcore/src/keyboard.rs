use embassy_time::{Duration, Ticker};

use crate::channel::EventSink;
use crate::config::KeyboardConfig;
use crate::debounce::DebouncerTrait;
use crate::debounce::default_debouncer::DefaultDebouncer;
use crate::dispatcher::Dispatcher;
use crate::encoder::{EncoderDecoder, EncoderLines, EncoderReader};
use crate::error::ConfigError;
use crate::event::{Edge, EncoderEvent, InputEvent, InputPos};
use crate::keymap::Keymap;
use crate::layer::LayerStack;
use crate::matrix::{MatrixReader, Scanner};

/// The keyboard runtime: scanner, encoders, layer stack and dispatcher run
/// on a fixed polling tick.
///
/// Each tick:
/// 1. a due one-shot layer expires,
/// 2. matrix events are processed in row-major order,
/// 3. encoder events are processed by encoder index, button before steps,
/// 4. the queued output events are flushed into the sink.
pub struct Keyboard<
    'a,
    const ROW: usize,
    const COL: usize,
    const NUM_LAYER: usize,
    const NUM_ENCODER: usize = 0,
    D: DebouncerTrait<ROW, COL> = DefaultDebouncer<ROW, COL>,
> {
    keymap: &'a Keymap<ROW, COL, NUM_LAYER, NUM_ENCODER>,
    scanner: Scanner<D, ROW, COL>,
    encoders: [EncoderDecoder; NUM_ENCODER],
    stack: LayerStack,
    dispatcher: Dispatcher,
    /// Number of ticks run so far
    tick: u32,
    tick_interval: Duration,
    one_shot_timeout_ticks: u32,
}

impl<'a, const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize>
    Keyboard<'a, ROW, COL, NUM_LAYER, NUM_ENCODER>
{
    /// Create a keyboard using the default tick-count debouncer
    pub fn new(
        keymap: &'a Keymap<ROW, COL, NUM_LAYER, NUM_ENCODER>,
        config: &KeyboardConfig,
    ) -> Result<Self, ConfigError> {
        let debouncer = DefaultDebouncer::new(config.matrix.debounce_ticks);
        Self::with_debouncer(keymap, debouncer, config)
    }
}

impl<'a, const ROW: usize, const COL: usize, const NUM_LAYER: usize, const NUM_ENCODER: usize, D>
    Keyboard<'a, ROW, COL, NUM_LAYER, NUM_ENCODER, D>
where
    D: DebouncerTrait<ROW, COL>,
{
    pub fn with_debouncer(
        keymap: &'a Keymap<ROW, COL, NUM_LAYER, NUM_ENCODER>,
        debouncer: D,
        config: &KeyboardConfig,
    ) -> Result<Self, ConfigError> {
        config.validate(ROW, COL, NUM_ENCODER)?;
        let debounce_ticks = config.matrix.debounce_ticks;
        let encoders = core::array::from_fn(|i| {
            let encoder = config.encoders.get(i).copied().unwrap_or_default();
            EncoderDecoder::new(i as u8, &encoder, debounce_ticks)
        });
        let behavior = &config.behavior;
        let one_shot_timeout_ticks = behavior.ticks(behavior.one_shot.timeout);
        info!(
            "Keyboard {}x{} with {} layers, {} encoders, one-shot timeout {} ticks",
            ROW, COL, NUM_LAYER, NUM_ENCODER, one_shot_timeout_ticks
        );

        Ok(Self {
            keymap,
            scanner: Scanner::new(debouncer),
            encoders,
            stack: LayerStack::new(),
            dispatcher: Dispatcher::new(),
            tick: 0,
            tick_interval: behavior.tick_interval,
            one_shot_timeout_ticks,
        })
    }

    /// Number of ticks run so far
    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    pub fn layer_stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn top_layer(&self) -> u8 {
        self.stack.top()
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.scanner.is_pressed(row, col)
    }

    /// Run one polling tick with the given raw readings.
    ///
    /// `encoder_lines[i]` is `None` when encoder `i` couldn't be read this tick.
    pub fn tick(
        &mut self,
        readings: &[[bool; COL]; ROW],
        encoder_lines: &[Option<EncoderLines>; NUM_ENCODER],
        sink: &mut impl EventSink,
    ) {
        let tick = self.tick;
        self.dispatcher
            .expire(&mut self.stack, tick, self.one_shot_timeout_ticks, sink);

        for event in self.scanner.poll(readings) {
            self.process(event.into(), sink);
        }

        for (decoder, lines) in self.encoders.iter_mut().zip(encoder_lines.iter()) {
            let Some(lines) = lines else {
                continue;
            };
            for event in decoder.poll(lines.a, lines.b, lines.button) {
                match event {
                    EncoderEvent::Button { id, edge } => {
                        let event = InputEvent {
                            pos: InputPos::EncoderButton(id),
                            edge,
                        };
                        self.dispatcher
                            .process(event, self.keymap, &mut self.stack, tick, sink);
                    }
                    EncoderEvent::Step { id, direction } => {
                        // A detent is a tap of its binding
                        let pos = InputPos::Encoder { id, direction };
                        for edge in [Edge::Press, Edge::Release] {
                            self.dispatcher
                                .process(InputEvent { pos, edge }, self.keymap, &mut self.stack, tick, sink);
                        }
                    }
                }
            }
        }

        self.dispatcher.flush(sink);
        self.tick = self.tick.wrapping_add(1);
    }

    fn process(&mut self, event: InputEvent, sink: &mut impl EventSink) {
        self.dispatcher
            .process(event, self.keymap, &mut self.stack, self.tick, sink);
    }

    /// Poll the matrix and the encoders forever, one tick per `tick_interval`.
    pub async fn run<M, E>(&mut self, matrix: &mut M, encoders: &mut [E; NUM_ENCODER], sink: &mut impl EventSink) -> !
    where
        M: MatrixReader<ROW, COL>,
        E: EncoderReader,
    {
        let mut ticker = Ticker::every(self.tick_interval);
        let mut readings = [[false; COL]; ROW];
        loop {
            matrix.read(&mut readings);
            let lines = encoders.each_mut().map(|encoder| encoder.read());
            self.tick(&readings, &lines, sink);
            ticker.next().await;
        }
    }
}
