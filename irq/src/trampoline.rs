// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interrupt trampolines.
//!
//! A trampoline is the entire body of an application-level ISR: it posts one
//! event bit to the dispatch task's [`Channel`] and, if that made the parked
//! dispatch task runnable, asks the scheduler for a context switch on the
//! way out. No other work happens in interrupt context; the real handling is
//! done later by the dispatch task.
//!
//! There is one trampoline per optional hardware source (button, display,
//! matrix display, GPS), each existing only when its Cargo feature is on, and
//! one per periodic timer (housekeeping, send cycle and, with `time-sync`,
//! time sync).
//!
//! Boards keep a [`Trampolines`] in a `static` next to the channel and call
//! the matching method from each vector:
//!
//! ```ignore
//! static EVENTS: Channel = Channel::new();
//! static IRQS: Trampolines<'static, PendSv> = Trampolines::new(&EVENTS, PendSv);
//!
//! #[interrupt]
//! fn IO_IRQ_BANK0() {
//!     clear_button_edge();
//!     IRQS.button();
//! }
//! ```

use crate::channel::{Channel, Woken};
use crate::events::Events;

/// Connection between the trampolines and the scheduler.
///
/// The only question a trampoline needs answered is how to make a freshly
/// woken task run as soon as the interrupt returns.
pub trait Port {
    /// Requests a context switch on return from the current interrupt.
    ///
    /// Called from interrupt context, only when a post actually woke the
    /// consumer.
    fn yield_from_isr(&self);
}

impl<P: Port + ?Sized> Port for &P {
    fn yield_from_isr(&self) {
        (**self).yield_from_isr()
    }
}

/// Port for cooperative executors, such as lilos, where the scheduler polls
/// woken tasks as soon as the ISR returns anyway.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoYield;

impl Port for NoYield {
    fn yield_from_isr(&self) {}
}

/// Interrupt-context producers for one channel.
#[derive(Debug)]
pub struct Trampolines<'c, P> {
    channel: &'c Channel,
    port: P,
}

impl<'c, P: Port> Trampolines<'c, P> {
    /// Binds trampolines to `channel`, yielding through `port`.
    pub const fn new(channel: &'c Channel, port: P) -> Self {
        Self { channel, port }
    }

    /// Posts `event` and yields if that woke the consumer.
    #[inline(always)]
    fn fire(&self, event: Events) {
        if self.channel.post_from_isr(event) == Woken::Consumer {
            self.port.yield_from_isr();
        }
    }

    /// Button pressed.
    #[cfg(feature = "button")]
    pub fn button(&self) {
        self.fire(Events::BUTTON)
    }

    /// Display refresh timer.
    #[cfg(feature = "display")]
    pub fn display(&self) {
        self.fire(Events::DISPLAY)
    }

    /// LED matrix refresh timer.
    #[cfg(feature = "matrix-display")]
    pub fn matrix_display(&self) {
        self.fire(Events::MATRIX_DISPLAY)
    }

    /// GPS buffer ready.
    #[cfg(feature = "gps")]
    pub fn gps(&self) {
        self.fire(Events::GPS)
    }

    /// Housekeeping cycle timer.
    pub fn cyclic(&self) {
        self.fire(Events::CYCLIC)
    }

    /// Payload send cycle timer.
    pub fn send_cycle(&self) {
        self.fire(Events::SEND_CYCLE)
    }

    /// Time sync timer.
    #[cfg(feature = "time-sync")]
    pub fn time_sync(&self) {
        self.fire(Events::TIME_SYNC)
    }
}
