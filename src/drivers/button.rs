//! ISR-debounced push-button driver.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up. GPIO fires on falling edge;
//! the ISR records the raw timestamp into an atomic, and `tick()` (called
//! from the main loop) runs the debounce state machine.
//!
//! A press counts once the line has stayed low past the debounce window
//! and is reported as [`ButtonEvent::ShortPress`] on release.

use core::sync::atomic::{AtomicU32, Ordering};

const DEBOUNCE_MS: u32 = 50;

/// Raw ISR timestamp (milliseconds since boot, truncated to u32).
/// Written by the ISR, read by the main loop.
static BUTTON_ISR_TIMESTAMP: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Idle,
    DebounceWait { since_ms: u32 },
    Pressed,
}

pub struct ButtonDriver {
    gpio: i32,
    state: PressState,
    last_isr_ms: u32,
}

impl ButtonDriver {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            state: PressState::Idle,
            last_isr_ms: 0,
        }
    }

    /// GPIO pin this button is attached to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// `now_ms` is the current monotonic time in milliseconds.
    pub fn tick(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        self.tick_with_level(now_ms, self.is_pressed_hw())
    }

    fn tick_with_level(&mut self, now_ms: u32, pressed: bool) -> Option<ButtonEvent> {
        let isr_ms = BUTTON_ISR_TIMESTAMP.load(Ordering::Acquire);
        let new_edge = isr_ms != self.last_isr_ms && isr_ms != 0;

        match self.state {
            PressState::Idle => {
                if new_edge {
                    self.last_isr_ms = isr_ms;
                    self.state = PressState::DebounceWait { since_ms: now_ms };
                }
                None
            }
            PressState::DebounceWait { since_ms } => {
                if now_ms.wrapping_sub(since_ms) < DEBOUNCE_MS {
                    return None;
                }
                // Bounce edges during the window are absorbed.
                self.last_isr_ms = isr_ms;
                self.state = if pressed {
                    PressState::Pressed
                } else {
                    PressState::Idle
                };
                None
            }
            PressState::Pressed => {
                if pressed {
                    return None;
                }
                self.last_isr_ms = isr_ms;
                self.state = PressState::Idle;
                Some(ButtonEvent::ShortPress)
            }
        }
    }

    /// Active-low: a low line means pressed.  Always released on host.
    fn is_pressed_hw(&self) -> bool {
        !crate::drivers::hw_init::gpio_read(self.gpio)
    }
}

/// ISR handler. Register this on the button GPIO falling edge.
/// Safe to call from interrupt context (lock-free atomic store).
pub fn button_isr_handler(now_ms: u32) {
    BUTTON_ISR_TIMESTAMP.store(now_ms, Ordering::Release);
}
