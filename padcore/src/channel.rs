//! Queue between the dispatcher and the output collaborator

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::event::OutputEvent;

/// Capacity of the output event queue
pub const OUTPUT_QUEUE_SIZE: usize = 16;

/// Consumer of the output event stream, e.g. a HID report assembler.
pub trait EventSink {
    fn consume(&mut self, event: OutputEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn consume(&mut self, event: OutputEvent) {
        (**self).consume(event)
    }
}

/// Bounded FIFO of output events.
///
/// Nothing is ever dropped: when the queue is full it is drained into the
/// sink before the new event goes in.
pub struct OutputQueue {
    channel: Channel<NoopRawMutex, OutputEvent, OUTPUT_QUEUE_SIZE>,
}

impl Default for OutputQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Queue an event, flushing into `sink` first if the queue is full
    pub fn send(&self, event: OutputEvent, sink: &mut impl EventSink) {
        if let Err(TrySendError::Full(event)) = self.channel.try_send(event) {
            trace!("Output queue full, flushing");
            self.flush(sink);
            // The queue is empty now
            let _ = self.channel.try_send(event);
        }
    }

    /// Hand every queued event to `sink`, in order
    pub fn flush(&self, sink: &mut impl EventSink) {
        while let Ok(event) = self.channel.try_receive() {
            sink.consume(event);
        }
    }
}
