// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Application-level interrupt dispatch.
//!
//! Hardware interrupts on a small device tend to want the same few things --
//! redraw the display, read the button, store a GPS fix -- none of which
//! belong in interrupt context. This crate funnels them all through one task:
//!
//! - **Trampolines** ([`trampoline`]) run in the ISRs and do nothing but set
//!   one bit in the event word and, if needed, request a reschedule.
//! - The **channel** ([`channel`]) is that word: many producers OR bits in,
//!   one consumer takes the whole thing at once.
//! - The **dispatch task** ([`dispatch`]) waits on the channel and calls the
//!   application's handlers, in a fixed order, for every bit it receives.
//! - **Mask control** ([`mask`]) lets task code silence the dispatch task for
//!   the length of a timing-critical bus transaction, after taking the bus.
//!
//! Which hardware sources exist is a compile-time decision made with Cargo
//! features; see [`config`].
//!
//! # Wiring it up
//!
//! ```ignore
//! static EVENTS: Channel = Channel::new();
//! static IRQS: Trampolines<'static, NoYield> = Trampolines::new(&EVENTS, NoYield);
//! static I2C: AtomicBusLock = AtomicBusLock::new();
//! static MASK: MaskControl<'static, &AtomicBusLock> = MaskControl::new(&EVENTS, &I2C);
//!
//! fn main() -> ! {
//!     let dispatcher = Dispatcher::new(
//!         EVENTS.receiver().unwrap(),
//!         Config::from_features(),
//!         Board::new(),
//!     );
//!     let task = core::pin::pin!(dispatcher.run());
//!     lilos::exec::run_tasks(&mut [task], lilos::exec::ALL_TASKS)
//! }
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod mask;
pub mod trampoline;

pub use channel::{Channel, Receiver, Woken};
pub use config::Config;
pub use dispatch::{Dispatcher, Handlers, NoTimeSync, Outcome, State, TimeSync};
pub use events::Events;
pub use mask::{AtomicBusLock, BusBusy, BusLock, CsBusLock, MaskControl};
pub use trampoline::{NoYield, Port, Trampolines};
