// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The notification channel: many producers, one consumer, one word.
//!
//! A [`Channel`] is a single `u32` of event bits plus one waiter slot. Anyone
//! may [`post`][Channel::post] bits into it -- task code, interrupt service
//! routines, timer callbacks -- and posting never blocks. Posted bits are
//! combined with a bitwise OR, so two producers racing each other (or racing
//! the consumer) merge their bits rather than overwriting them. Nothing posted
//! is ever lost; posting the same bit twice before the consumer wakes is
//! indistinguishable from posting it once.
//!
//! There is exactly one consumer. It obtains its [`Receiver`] once, through
//! [`Channel::receiver`], and every later attempt gets `None`. Receiving
//! atomically takes the *entire* accumulated word and leaves zero behind.
//!
//! This is deliberately not a queue. The consumer only cares which events are
//! pending, not how many times or in which order they were raised, and a
//! single atomic word gives us that with no allocation and no locking, which
//! is what makes it usable from an ISR.
//!
//!
//! # Waking the consumer
//!
//! [`Receiver::receive`] returns a future that parks the consumer task until
//! the word is nonzero. It never times out. The future registers its `Waker`
//! *before* checking the word, so a post that lands between the check and the
//! task going to sleep still finds the waker and wakes it. (This is the same
//! discipline as `Notify::until_racy` in lilos, for the same reason: the
//! producer may be a preempting interrupt handler.)
//!
//! Posting from an interrupt should use [`Channel::post_from_isr`], which
//! reports whether the post woke a parked consumer. On a preemptive scheduler
//! that is the cue to request a context switch before the ISR returns; see
//! the [`trampoline`][crate::trampoline] module, which wraps this up.
//!
//! ```ignore
//! static EVENTS: Channel = Channel::new();
//!
//! /// Timer interrupt for the display refresh.
//! #[interrupt]
//! fn TIMER0() {
//!     if EVENTS.post_from_isr(Events::DISPLAY) == Woken::Consumer {
//!         cortex_m::peripheral::SCB::set_pendsv();
//!     }
//! }
//!
//! async fn consumer() -> Infallible {
//!     let mut rx = EVENTS.receiver().unwrap();
//!     loop {
//!         let events = rx.receive().await;
//!         // ...
//!     }
//! }
//! ```

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_util::task::AtomicWaker;
use pin_project::pin_project;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::events::Events;

/// What a post from interrupt context did to the consumer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use = "an ISR should request a reschedule when this is `Woken::Consumer`"]
pub enum Woken {
    /// The consumer was not parked; it will see the bits the next time it
    /// looks.
    Nobody,
    /// The consumer was parked on this channel and has been made runnable.
    Consumer,
}

/// Event word shared between producers and the single consumer.
///
/// `Channel::new` is `const`, so the usual home for one is a `static`:
///
/// ```ignore
/// static EVENTS: Channel = Channel::new();
/// ```
#[derive(Debug, Default)]
pub struct Channel {
    bits: AtomicU32,
    waiter: AtomicWaker,
    taken: AtomicBool,
}

impl Channel {
    /// Creates an empty channel whose receiver has not been handed out.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            waiter: AtomicWaker::new(),
            taken: AtomicBool::new(false),
        }
    }

    /// Hands out the consumer end of the channel.
    ///
    /// Succeeds exactly once per channel; every later call returns `None`.
    pub fn receiver(&self) -> Option<Receiver<'_>> {
        if self.taken.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Receiver { channel: self })
        }
    }

    /// ORs `events` into the word from task context.
    ///
    /// Never blocks. Any parked consumer is woken; since the caller is task
    /// code, the scheduler will get around to it on its own.
    pub fn post(&self, events: Events) {
        let _ = self.post_from_isr(events);
    }

    /// ORs `events` into the word from interrupt context.
    ///
    /// Never blocks, and is safe to call from an ISR that preempts the
    /// consumer mid-receive. Returns [`Woken::Consumer`] if the consumer was
    /// parked waiting for this channel, in which case the ISR should request
    /// a reschedule before returning.
    pub fn post_from_isr(&self, events: Events) -> Woken {
        if events.is_empty() {
            return Woken::Nobody;
        }
        self.bits.fetch_or(events.bits(), Ordering::SeqCst);
        match self.waiter.take() {
            Some(waker) => {
                waker.wake();
                Woken::Consumer
            }
            None => Woken::Nobody,
        }
    }

    /// Returns the bits posted but not yet received, without consuming them.
    ///
    /// This is a snapshot for diagnostics; by the time you look at it, it may
    /// already be stale.
    pub fn pending(&self) -> Events {
        Events::from_bits_truncate(self.bits.load(Ordering::SeqCst))
    }

    /// Takes the whole word, leaving zero. `None` if nothing was pending.
    fn take(&self) -> Option<Events> {
        match self.bits.swap(0, Ordering::SeqCst) {
            0 => None,
            raw => Some(Events::from_bits_truncate(raw)),
        }
    }
}

/// The one consumer end of a [`Channel`].
#[derive(Debug)]
pub struct Receiver<'c> {
    channel: &'c Channel,
}

impl<'c> Receiver<'c> {
    /// Waits until at least one bit has been posted, then takes everything
    /// that has accumulated.
    ///
    /// The result contains every defined bit posted since the previous
    /// receive. Bits outside the defined [`Events`] set are cleared along
    /// with the rest but not reported. (So a wake caused only by undefined
    /// bits resolves to an empty set.)
    ///
    /// # Cancellation
    ///
    /// **Cancel safety:** Strict.
    ///
    /// Bits are only taken on the poll that resolves the future, so dropping
    /// it early loses nothing. It may leave a waker registered, costing one
    /// spurious wakeup later.
    pub fn receive(&mut self) -> Receive<'_, 'c> {
        Receive { receiver: self }
    }

    /// Takes whatever has accumulated without waiting.
    pub fn try_receive(&mut self) -> Option<Events> {
        self.channel.take()
    }

    /// The channel this receiver drains.
    pub fn channel(&self) -> &'c Channel {
        self.channel
    }
}

/// Future returned by [`Receiver::receive`].
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[pin_project]
pub struct Receive<'r, 'c> {
    receiver: &'r mut Receiver<'c>,
}

impl Future for Receive<'_, '_> {
    type Output = Events;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let p = self.project();
        let channel = p.receiver.channel;
        // Subscribe first, then look: a post racing us either lands before
        // the swap (and we see it) or finds our waker.
        channel.waiter.register(cx.waker());
        match channel.take() {
            Some(events) => {
                // We're not parking after all. Withdraw the waker so the
                // next ISR post doesn't claim to have woken us.
                drop(channel.waiter.take());
                Poll::Ready(events)
            }
            None => Poll::Pending,
        }
    }
}
