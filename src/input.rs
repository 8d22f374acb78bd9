//! # Edge Input Module
//!
//! Turns raw pin edges from the rotary encoder and its push-button into
//! `InputEvent`s on the event queue. Handlers are meant to be called from
//! pin-change interrupts: constant time, no allocation, no blocking.

use crate::queue::QueueWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// One detent, +1 clockwise or -1 counter-clockwise
    RotaryStep(i8),
    ButtonPress,
}

/// Gate for mechanical bounce on the push-button line.
///
/// The reference point moves on every falling edge, accepted or not, so a
/// burst of bounces keeps pushing the next acceptance further out.
#[derive(Debug, Clone)]
pub struct ButtonDebouncer {
    window_ms: u32,
    last_edge_ms: u32,
}

impl ButtonDebouncer {
    pub fn new(window_ms: u32, now_ms: u32) -> Self {
        Self {
            window_ms,
            last_edge_ms: now_ms,
        }
    }

    /// Register a falling edge at `now_ms` (wrapping millisecond tick)
    pub fn accept(&mut self, now_ms: u32) -> bool {
        let elapsed = now_ms.wrapping_sub(self.last_edge_ms);
        self.last_edge_ms = now_ms;
        elapsed > self.window_ms
    }
}

pub struct EdgeInputSource<'q, const N: usize> {
    events: QueueWriter<'q, InputEvent, N>,
    button: ButtonDebouncer,
}

impl<'q, const N: usize> EdgeInputSource<'q, N> {
    pub fn new(events: QueueWriter<'q, InputEvent, N>, debounce_ms: u32, now_ms: u32) -> Self {
        Self {
            events,
            button: ButtonDebouncer::new(debounce_ms, now_ms),
        }
    }

    /// Rising edge on channel A; `b_high` is channel B sampled at the same instant
    pub fn on_rotary_rising(&mut self, b_high: bool) {
        let step = if b_high { -1 } else { 1 };
        self.events.try_push(InputEvent::RotaryStep(step));
    }

    /// Falling edge on the button line
    pub fn on_button_falling(&mut self, now_ms: u32) {
        if self.button.accept(now_ms) {
            self.events.try_push(InputEvent::ButtonPress);
        }
    }
}
