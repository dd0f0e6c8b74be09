// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The event word.
//!
//! Every interrupt source and every control request owns exactly one bit.
//! Bits are independent and routinely arrive together, since the channel
//! merges everything posted between two wakes of the dispatch task.

use bitflags::bitflags;

bitflags! {
    /// Set of events carried by one notification.
    ///
    /// The assignments are fixed; boards built with fewer features simply
    /// never post the bits they don't have.
    pub struct Events: u32 {
        /// Display needs a refresh.
        const DISPLAY        = 0x001;
        /// Button was pressed.
        const BUTTON         = 0x002;
        /// Time to send the payload.
        const SEND_CYCLE     = 0x004;
        /// Cyclic housekeeping is due.
        const CYCLIC         = 0x008;
        /// Time to resync the clock.
        const TIME_SYNC      = 0x010;
        /// Control: stop handling events. Posted only by `MaskControl::mask`.
        const MASK           = 0x020;
        /// Control: resume handling events. Posted only by
        /// `MaskControl::unmask`.
        const UNMASK         = 0x040;
        /// GPS has a new buffer worth storing.
        const GPS            = 0x080;
        /// LED matrix display needs a refresh.
        const MATRIX_DISPLAY = 0x100;
    }
}

impl Events {
    /// The two control bits. Everything else is an event for a handler.
    pub const CONTROL: Self = Self::from_bits_truncate(Self::MASK.bits() | Self::UNMASK.bits());

    /// Returns `true` if either control bit is present.
    pub fn is_control(&self) -> bool {
        self.intersects(Self::CONTROL)
    }
}
