//! Scripted stand-in for a person at the device: turns the encoder to each
//! planned menu entry, presses the button, and acknowledges whatever screen
//! the session ends on.

use crate::input::EdgeInputSource;
use crate::session::{Frame, MenuItem, Phase};
use std::collections::VecDeque;
use std::time::Instant;

pub struct ScriptedOperator {
    plan: VecDeque<MenuItem>,
    current: Option<MenuItem>,
    started: Instant,
    last_press_ms: Option<u32>,
    press_gap_ms: u32,
}

impl ScriptedOperator {
    pub fn new(plan: impl IntoIterator<Item = MenuItem>, debounce_ms: u32) -> Self {
        Self {
            plan: plan.into_iter().collect(),
            current: None,
            started: Instant::now(),
            last_press_ms: None,
            // Comfortably outside the debounce window
            press_gap_ms: debounce_ms.saturating_mul(3).max(300),
        }
    }

    fn now_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    fn press<const N: usize>(&mut self, input: &mut EdgeInputSource<'_, N>) -> bool {
        let now = self.now_ms();
        let ready = self
            .last_press_ms
            .map_or(now > self.press_gap_ms, |last| now.wrapping_sub(last) > self.press_gap_ms);
        if ready {
            input.on_button_falling(now);
            self.last_press_ms = Some(now);
        }
        ready
    }

    /// React to the latest frame. Returns `false` once the plan is done.
    pub fn act<const N: usize>(&mut self, frame: &Frame, input: &mut EdgeInputSource<'_, N>) -> bool {
        match frame.phase {
            Phase::Idle => {
                let Some(&target) = self.plan.front() else {
                    return false;
                };
                let (have, want) = (frame.selected.position(), target.position());
                if have != want {
                    // Channel B high on the rising edge of A means counter-clockwise
                    input.on_rotary_rising(want < have);
                } else if self.press(input) {
                    log::info!("Operator: selecting {}", target.label());
                    self.current = self.plan.pop_front();
                }
            }
            Phase::Live if self.current == Some(MenuItem::HeartRate) => {
                if frame.live_bpm.is_some() && self.press(input) {
                    log::info!("Operator: stopping heart rate view");
                }
            }
            Phase::Result | Phase::Error | Phase::History => {
                self.press(input);
            }
            Phase::Warmup | Phase::Live | Phase::Finalizing => {}
        }
        true
    }
}
