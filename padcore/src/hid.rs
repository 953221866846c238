//! HID report assembly from the output event stream.
//!
//! Only the report values are built here, writing them to a host is up to
//! the [`ReportWriter`].

use usbd_hid::descriptor::{KeyboardReport, MediaKeyboardReport, SystemControlReport};

use crate::channel::EventSink;
use crate::event::OutputEvent;
use crate::types::keycode::KeyCode;

pub enum Report {
    /// Normal keyboard hid report
    KeyboardReport(KeyboardReport),
    /// Media keyboard report
    MediaKeyboardReport(MediaKeyboardReport),
    /// System control report
    SystemControlReport(SystemControlReport),
}

/// Transport of HID reports, e.g. a USB or BLE HID writer.
pub trait ReportWriter {
    fn write_report(&mut self, report: Report);

    /// The top layer changed, for status displays
    fn layer_changed(&mut self, _layer: u8) {}
}

/// Folds `KeyDown`/`KeyUp` events into 6KRO keyboard reports and consumer reports.
///
/// Every event that changes a report writes the full new report.
pub struct ReportBuilder<W: ReportWriter> {
    writer: W,
    held_modifiers: u8,
    /// Number of held sources per modifier bit
    modifier_counts: [u8; 8],
    held_keycodes: [KeyCode; 6],
    /// Number of held sources per keycode slot
    key_counts: [u8; 6],
    media_usage: u16,
    media_count: u8,
    system_usage: u8,
    system_count: u8,
}

impl<W: ReportWriter> ReportBuilder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            held_modifiers: 0,
            modifier_counts: [0; 8],
            held_keycodes: [KeyCode::No; 6],
            key_counts: [0; 6],
            media_usage: 0,
            media_count: 0,
            system_usage: 0,
            system_count: 0,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn register_key(&mut self, key: KeyCode) {
        if key.is_modifier() {
            let index = (key as u16 - KeyCode::LCtrl as u16) as usize;
            self.modifier_counts[index] = self.modifier_counts[index].saturating_add(1);
            if self.held_modifiers & key.as_modifier_bit() == 0 {
                self.held_modifiers |= key.as_modifier_bit();
                self.send_keyboard_report();
            }
        } else if key.is_basic() {
            // Another source already holds this key
            if let Some(index) = self.held_keycodes.iter().position(|&k| k == key) {
                self.key_counts[index] = self.key_counts[index].saturating_add(1);
                return;
            }
            match self.held_keycodes.iter().position(|&k| k == KeyCode::No) {
                Some(index) => {
                    self.held_keycodes[index] = key;
                    self.key_counts[index] = 1;
                    self.send_keyboard_report();
                }
                None => warn!("Keyboard report is full, dropping {:?}", key),
            }
        } else if let Some(usage_id) = key.as_consumer_usage_id() {
            if self.media_usage == usage_id {
                self.media_count = self.media_count.saturating_add(1);
            } else {
                self.media_usage = usage_id;
                self.media_count = 1;
                self.send_media_report();
            }
        } else if let Some(usage_id) = key.as_system_usage_id() {
            if self.system_usage == usage_id {
                self.system_count = self.system_count.saturating_add(1);
            } else {
                self.system_usage = usage_id;
                self.system_count = 1;
                self.send_system_report();
            }
        }
    }

    /// A key is reported released once every source holding it released it
    fn unregister_key(&mut self, key: KeyCode) {
        if key.is_modifier() {
            let index = (key as u16 - KeyCode::LCtrl as u16) as usize;
            self.modifier_counts[index] = self.modifier_counts[index].saturating_sub(1);
            if self.modifier_counts[index] == 0 && self.held_modifiers & key.as_modifier_bit() != 0 {
                self.held_modifiers &= !key.as_modifier_bit();
                self.send_keyboard_report();
            }
        } else if key.is_basic() {
            if let Some(index) = self.held_keycodes.iter().position(|&k| k == key) {
                self.key_counts[index] = self.key_counts[index].saturating_sub(1);
                if self.key_counts[index] == 0 {
                    self.held_keycodes[index] = KeyCode::No;
                    self.send_keyboard_report();
                }
            }
        } else if self.media_usage != 0 && key.as_consumer_usage_id() == Some(self.media_usage) {
            self.media_count = self.media_count.saturating_sub(1);
            if self.media_count == 0 {
                self.media_usage = 0;
                self.send_media_report();
            }
        } else if self.system_usage != 0 && key.as_system_usage_id() == Some(self.system_usage) {
            self.system_count = self.system_count.saturating_sub(1);
            if self.system_count == 0 {
                self.system_usage = 0;
                self.send_system_report();
            }
        }
    }

    fn send_keyboard_report(&mut self) {
        self.writer.write_report(Report::KeyboardReport(KeyboardReport {
            modifier: self.held_modifiers,
            reserved: 0,
            leds: 0,
            keycodes: self.held_keycodes.map(|k| k as u8),
        }));
    }

    fn send_media_report(&mut self) {
        self.writer.write_report(Report::MediaKeyboardReport(MediaKeyboardReport {
            usage_id: self.media_usage,
        }));
    }

    fn send_system_report(&mut self) {
        self.writer.write_report(Report::SystemControlReport(SystemControlReport {
            usage_id: self.system_usage,
        }));
    }
}

impl<W: ReportWriter> EventSink for ReportBuilder<W> {
    fn consume(&mut self, event: OutputEvent) {
        match event {
            OutputEvent::KeyDown(key) => self.register_key(key),
            OutputEvent::KeyUp(key) => self.unregister_key(key),
            OutputEvent::LayerChanged(layer) => self.writer.layer_changed(layer),
        }
    }
}
