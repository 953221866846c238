//! Quadrature rotary encoder decoding.
//!
//! The two encoder lines form a 2-bit phase `(a << 1) | b` that walks
//! `00 -> 01 -> 11 -> 10 -> 00` when turned clockwise. Every valid transition
//! moves an accumulator by one, a full detent (`divisor` transitions) emits a
//! step.

use embedded_hal::digital::{ErrorType, InputPin};
use heapless::Vec;

use crate::config::EncoderConfig;
use crate::debounce::{DebounceState, SwitchState};
use crate::event::{Direction, Edge, EncoderEvent};

/// Max events of one encoder poll: a button transition and a step
pub const ENCODER_EVENTS_MAX: usize = 2;

/// Raw line levels of an encoder, `true` means the line is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderLines {
    pub a: bool,
    pub b: bool,
    /// `None` if the encoder has no push button
    pub button: Option<bool>,
}

/// Source of raw encoder line levels.
pub trait EncoderReader {
    /// `None` when the lines can't be read this tick
    fn read(&mut self) -> Option<EncoderLines>;
}

/// Decoding state of one encoder.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderDecoder {
    id: u8,
    divisor: u8,
    reverse: bool,
    debounce_ticks: u8,
    last_phase: u8,
    accumulator: i8,
    button: SwitchState,
}

impl EncoderDecoder {
    pub fn new(id: u8, config: &EncoderConfig, debounce_ticks: u8) -> Self {
        Self {
            id,
            divisor: config.divisor.clamp(1, i8::MAX as u8),
            reverse: config.reverse,
            debounce_ticks: debounce_ticks.max(1),
            last_phase: 0,
            accumulator: 0,
            button: SwitchState::Released,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn accumulator(&self) -> i8 {
        self.accumulator
    }

    /// Process one tick of line readings.
    ///
    /// The button event, if any, comes before the step.
    pub fn poll(&mut self, a: bool, b: bool, button: Option<bool>) -> Vec<EncoderEvent, ENCODER_EVENTS_MAX> {
        let mut events = Vec::new();
        if let Some(raw) = button {
            if let DebounceState::Debounced = self.button.update(raw, self.debounce_ticks) {
                let edge = Edge::from_pressed(raw);
                debug!("Encoder {} button {:?}", self.id, edge);
                let _ = events.push(EncoderEvent::Button { id: self.id, edge });
            }
        }
        if let Some(direction) = self.update_phase(a, b) {
            debug!("Encoder {} step {:?}", self.id, direction);
            let _ = events.push(EncoderEvent::Step { id: self.id, direction });
        }
        events
    }

    fn update_phase(&mut self, a: bool, b: bool) -> Option<Direction> {
        let phase = ((a as u8) << 1) | b as u8;
        let last = self.last_phase;
        if phase == last {
            return None;
        }
        self.last_phase = phase;

        let delta: i8 = match (last, phase) {
            (0b00, 0b01) | (0b01, 0b11) | (0b11, 0b10) | (0b10, 0b00) => 1,
            (0b01, 0b00) | (0b11, 0b01) | (0b10, 0b11) | (0b00, 0b10) => -1,
            _ => {
                // Both lines changed at once, the direction is unknown
                debug!("Encoder {} glitch {} -> {}", self.id, last, phase);
                return None;
            }
        };

        self.accumulator += delta;
        let direction = if self.accumulator >= self.divisor as i8 {
            Direction::Clockwise
        } else if self.accumulator <= -(self.divisor as i8) {
            Direction::CounterClockwise
        } else {
            return None;
        };
        self.accumulator = 0;
        Some(if self.reverse { direction.reversed() } else { direction })
    }
}

/// Stand-in for an encoder without a push button.
pub struct NoButton;

impl ErrorType for NoButton {
    type Error = core::convert::Infallible;
}

impl InputPin for NoButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Encoder lines read from input pins.
///
/// Encoder contacts and buttons pull their lines to ground, so a low level
/// reads as active.
pub struct EncoderPins<A: InputPin, B: InputPin, P: InputPin = NoButton> {
    pin_a: A,
    pin_b: B,
    button: Option<P>,
}

impl<A: InputPin, B: InputPin> EncoderPins<A, B, NoButton> {
    pub fn new(pin_a: A, pin_b: B) -> Self {
        Self {
            pin_a,
            pin_b,
            button: None,
        }
    }
}

impl<A: InputPin, B: InputPin, P: InputPin> EncoderPins<A, B, P> {
    pub fn with_button(pin_a: A, pin_b: B, button: P) -> Self {
        Self {
            pin_a,
            pin_b,
            button: Some(button),
        }
    }
}

impl<A: InputPin, B: InputPin, P: InputPin> EncoderReader for EncoderPins<A, B, P> {
    fn read(&mut self) -> Option<EncoderLines> {
        let a = self.pin_a.is_low().ok()?;
        let b = self.pin_b.is_low().ok()?;
        let button = match self.button.as_mut() {
            Some(pin) => Some(pin.is_low().unwrap_or(false)),
            None => None,
        };
        Some(EncoderLines { a, b, button })
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    use super::*;

    fn decoder(divisor: u8, reverse: bool) -> EncoderDecoder {
        let config = EncoderConfig {
            divisor,
            reverse,
            ..Default::default()
        };
        EncoderDecoder::new(0, &config, 2)
    }

    fn feed(decoder: &mut EncoderDecoder, phases: &[u8]) -> std::vec::Vec<EncoderEvent> {
        phases
            .iter()
            .flat_map(|p| decoder.poll(p & 0b10 != 0, p & 0b01 != 0, None))
            .collect()
    }

    #[test]
    fn test_full_detent_clockwise() {
        let mut decoder = decoder(4, false);
        let events = feed(&mut decoder, &[0b00, 0b01, 0b11, 0b10, 0b00]);
        assert_eq!(
            events,
            [EncoderEvent::Step {
                id: 0,
                direction: Direction::Clockwise
            }]
        );
        assert_eq!(decoder.accumulator(), 0);
    }

    #[test]
    fn test_full_detent_counter_clockwise() {
        let mut decoder = decoder(4, false);
        let events = feed(&mut decoder, &[0b00, 0b10, 0b11, 0b01, 0b00]);
        assert_eq!(
            events,
            [EncoderEvent::Step {
                id: 0,
                direction: Direction::CounterClockwise
            }]
        );
    }

    #[test]
    fn test_jitter_emits_nothing() {
        let mut decoder = decoder(4, false);
        let events = feed(&mut decoder, &[0b00, 0b01, 0b00, 0b01, 0b00]);
        assert!(events.is_empty());
        assert_eq!(decoder.accumulator(), 0);
    }

    #[test]
    fn test_glitch_keeps_accumulator() {
        let mut decoder = decoder(4, false);
        // +1, then a two-bit jump resyncs the phase without counting
        let events = feed(&mut decoder, &[0b01, 0b10]);
        assert!(events.is_empty());
        assert_eq!(decoder.accumulator(), 1);
        // 10 -> 00 -> 01 -> 11 completes the detent
        let events = feed(&mut decoder, &[0b00, 0b01, 0b11]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_divisor_and_reverse() {
        let mut decoder = decoder(2, true);
        let events = feed(&mut decoder, &[0b01, 0b11, 0b10, 0b00]);
        assert_eq!(
            events,
            [
                EncoderEvent::Step {
                    id: 0,
                    direction: Direction::CounterClockwise
                },
                EncoderEvent::Step {
                    id: 0,
                    direction: Direction::CounterClockwise
                }
            ]
        );
    }

    #[test]
    fn test_button_is_debounced() {
        let mut decoder = decoder(4, false);
        assert!(decoder.poll(false, false, Some(true)).is_empty());
        let events = decoder.poll(false, true, Some(true));
        assert_eq!(
            events.as_slice(),
            &[EncoderEvent::Button {
                id: 0,
                edge: Edge::Press
            }]
        );
        assert!(decoder.poll(false, true, Some(false)).is_empty());
        assert!(decoder.poll(false, true, Some(true)).is_empty());
    }

    #[test]
    fn test_pins_are_active_low() {
        let a = PinMock::new(&[Transaction::get(State::Low)]);
        let b = PinMock::new(&[Transaction::get(State::High)]);
        let button = PinMock::new(&[Transaction::get(State::Low)]);
        let mut clones = [a.clone(), b.clone(), button.clone()];

        let mut pins = EncoderPins::with_button(a, b, button);
        assert_eq!(
            pins.read(),
            Some(EncoderLines {
                a: true,
                b: false,
                button: Some(true)
            })
        );
        for pin in clones.iter_mut() {
            pin.done();
        }
    }
}
