//! # padcore types
//!
//! Plain data shared by the padcore runtime and the configuration loader.
//!
//! - [`keycode`] - HID keycodes, including media and system keys
//! - [`modifier`] - Modifier combinations held together with a key
//! - [`action`] - The closed set of keymap bindings and encoder bindings

#![no_std]

pub mod action;
pub mod keycode;
mod layout_macro;
pub mod modifier;
