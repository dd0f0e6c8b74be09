// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Masking event handling around timing-critical bus transactions.
//!
//! Some bus sequences (an I2C transfer to a sensor with tight timing, say)
//! must not be interleaved with the display or matrix refresh handlers, which
//! talk on the same bus. [`MaskControl::mask`] takes the bus lock and then
//! tells the dispatch task to stop handling events; [`MaskControl::unmask`]
//! releases the bus and tells it to resume.
//!
//! The order matters. `mask` posts the suppress request only *after* the lock
//! is held, so the dispatch task is never told to stand down while the bus is
//! still up for grabs. If the lock can't be had, nothing is posted and the
//! caller gets [`BusBusy`].
//!
//! Both operations are requests. They return as soon as the control bit is
//! posted; the dispatch task acts on it whenever it next wakes.

use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};

use crate::channel::Channel;
use crate::events::Events;

/// Exclusive access to a shared hardware bus.
pub trait BusLock {
    /// Tries to take the bus. Returns `true` if the caller now holds it.
    fn try_acquire(&self) -> bool;

    /// Gives the bus back. Only called by the holder.
    fn release(&self);
}

impl<L: BusLock + ?Sized> BusLock for &L {
    fn try_acquire(&self) -> bool {
        (**self).try_acquire()
    }

    fn release(&self) {
        (**self).release()
    }
}

/// A [`BusLock`] made of a single atomic flag.
///
/// Doesn't wait: if somebody else holds the bus, `try_acquire` fails at once.
#[derive(Debug, Default)]
pub struct AtomicBusLock {
    held: AtomicBool,
}

impl AtomicBusLock {
    /// Creates a lock in the free state.
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Returns `true` if someone holds the bus right now.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl BusLock for AtomicBusLock {
    fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn release(&self) {
        self.held.store(false, Ordering::Release);
    }
}

/// A [`BusLock`] whose flag is only touched inside a critical section.
///
/// For boards that already guard their bus state with `critical-section`
/// and want the lock to share that discipline. Like [`AtomicBusLock`], it
/// never waits.
pub struct CsBusLock {
    held: Mutex<Cell<bool>>,
}

impl CsBusLock {
    /// Creates a lock in the free state.
    pub const fn new() -> Self {
        Self {
            held: Mutex::new(Cell::new(false)),
        }
    }

    /// Returns `true` if someone holds the bus right now.
    pub fn is_held(&self) -> bool {
        critical_section::with(|cs| self.held.borrow(cs).get())
    }
}

impl Default for CsBusLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CsBusLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsBusLock")
            .field("held", &self.is_held())
            .finish()
    }
}

impl BusLock for CsBusLock {
    fn try_acquire(&self) -> bool {
        critical_section::with(|cs| !self.held.borrow(cs).replace(true))
    }

    fn release(&self) {
        critical_section::with(|cs| self.held.borrow(cs).set(false));
    }
}

/// Error from [`MaskControl::mask`]: the bus lock was held by someone else.
///
/// No suppression was requested. Retrying is up to the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusBusy;

impl fmt::Display for BusBusy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("bus is held by another owner")
    }
}

/// The `mask`/`unmask` pair for one channel and one bus.
#[derive(Debug)]
pub struct MaskControl<'c, L> {
    channel: &'c Channel,
    lock: L,
}

impl<'c, L: BusLock> MaskControl<'c, L> {
    /// Pairs `channel` with the `lock` guarding the bus.
    pub const fn new(channel: &'c Channel, lock: L) -> Self {
        Self { channel, lock }
    }

    /// Takes the bus and asks the dispatch task to suppress events.
    ///
    /// On failure nothing is posted and the dispatch task keeps handling
    /// events as before.
    pub fn mask(&self) -> Result<(), BusBusy> {
        if !self.lock.try_acquire() {
            warn!("bus busy, not masking");
            return Err(BusBusy);
        }
        self.channel.post(Events::MASK);
        Ok(())
    }

    /// Releases the bus and asks the dispatch task to resume.
    pub fn unmask(&self) {
        self.lock.release();
        self.channel.post(Events::UNMASK);
    }

    /// Runs `body` with events masked, unmasking afterwards even if `body`
    /// unwinds.
    ///
    /// If the bus can't be taken, `body` is not run.
    pub fn masked<R>(&self, body: impl FnOnce() -> R) -> Result<R, BusBusy> {
        self.mask()?;
        let _unmask = scopeguard::guard((), |()| self.unmask());
        Ok(body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_lock_is_exclusive() {
        let lock = AtomicBusLock::new();
        assert!(!lock.is_held());
        assert!(lock.try_acquire());
        assert!(lock.is_held());
        assert!(!lock.try_acquire());
        lock.release();
        assert!(!lock.is_held());
        assert!(lock.try_acquire());
    }

    #[test]
    fn cs_lock_is_exclusive() {
        let lock = CsBusLock::new();
        assert!(!lock.is_held());
        assert!(lock.try_acquire());
        assert!(lock.is_held());
        assert!(!lock.try_acquire());
        lock.release();
        assert!(!lock.is_held());
        assert!(lock.try_acquire());
    }

    #[test]
    fn cs_lock_gates_mask() {
        static BUS: CsBusLock = CsBusLock::new();
        let ch = Channel::new();
        let mut rx = ch.receiver().unwrap();
        let ctl = MaskControl::new(&ch, &BUS);

        assert_eq!(ctl.mask(), Ok(()));
        assert_eq!(ctl.mask(), Err(BusBusy));
        assert_eq!(rx.try_receive(), Some(Events::MASK));
        ctl.unmask();
        assert!(!BUS.is_held());
        assert_eq!(rx.try_receive(), Some(Events::UNMASK));
    }

    #[test]
    fn mask_takes_bus_then_posts() {
        let ch = Channel::new();
        let mut rx = ch.receiver().unwrap();
        let lock = AtomicBusLock::new();
        let ctl = MaskControl::new(&ch, &lock);

        assert_eq!(ctl.mask(), Ok(()));
        assert!(lock.is_held());
        assert_eq!(rx.try_receive(), Some(Events::MASK));
    }

    #[test]
    fn mask_fails_without_posting_when_bus_is_held() {
        let ch = Channel::new();
        let mut rx = ch.receiver().unwrap();
        let lock = AtomicBusLock::new();
        assert!(lock.try_acquire());
        let ctl = MaskControl::new(&ch, &lock);

        assert_eq!(ctl.mask(), Err(BusBusy));
        assert_eq!(rx.try_receive(), None);
        // Still held by the other owner.
        assert!(lock.is_held());
    }

    #[test]
    fn unmask_releases_then_posts() {
        let ch = Channel::new();
        let mut rx = ch.receiver().unwrap();
        let lock = AtomicBusLock::new();
        let ctl = MaskControl::new(&ch, &lock);

        ctl.mask().unwrap();
        ctl.unmask();
        assert!(!lock.is_held());
        assert_eq!(rx.try_receive(), Some(Events::MASK | Events::UNMASK));
    }

    #[test]
    fn masked_brackets_the_body() {
        let ch = Channel::new();
        let mut rx = ch.receiver().unwrap();
        let lock = AtomicBusLock::new();
        let ctl = MaskControl::new(&ch, &lock);

        let r = ctl.masked(|| {
            assert!(lock.is_held());
            assert_eq!(ch.pending(), Events::MASK);
            42
        });
        assert_eq!(r, Ok(42));
        assert!(!lock.is_held());
        assert_eq!(rx.try_receive(), Some(Events::MASK | Events::UNMASK));
    }

    #[test]
    fn masked_skips_body_when_bus_is_busy() {
        let ch = Channel::new();
        let lock = AtomicBusLock::new();
        assert!(lock.try_acquire());
        let ctl = MaskControl::new(&ch, &lock);

        let mut ran = false;
        assert_eq!(ctl.masked(|| ran = true), Err(BusBusy));
        assert!(!ran);
        assert_eq!(ch.pending(), Events::empty());
    }

    #[test]
    fn masked_unmasks_on_unwind() {
        let ch = Channel::new();
        let lock = AtomicBusLock::new();
        let ctl = MaskControl::new(&ch, &lock);

        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = ctl.masked(|| panic!("bus transaction failed"));
        }));
        assert!(r.is_err());
        assert!(!lock.is_held());
        assert_eq!(ch.pending(), Events::MASK | Events::UNMASK);
    }

    #[test]
    fn busy_error_displays() {
        assert_eq!(BusBusy.to_string(), "bus is held by another owner");
    }
}
