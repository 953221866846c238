//! Keyboard runtime core: debounced matrix scanning, rotary encoder
//! decoding, layered keymap resolution and an ordered output event stream.
//!
//! Everything runs on a fixed polling tick, see [`keyboard::Keyboard`].

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod channel;
pub mod config;
pub mod debounce;
pub mod dispatcher;
pub mod encoder;
pub mod error;
pub mod event;
pub mod hid;
pub mod keyboard;
pub mod keymap;
pub mod layer;
pub mod matrix;

pub use error::ConfigError;
pub use padcore_types as types;
pub use padcore_types::{a, encoder, k, layer, mac, mo, osl, tg, to, wm};
