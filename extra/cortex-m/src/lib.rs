// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cortex-M port for `paxirq`.
//!
//! Provides [`PendSv`], a [`Port`] that requests a reschedule by pending the
//! PendSV exception, which is how preemptive Cortex-M kernels switch context
//! on the way out of an ISR. (With a cooperative executor like lilos, use
//! `paxirq::NoYield` instead: the executor polls woken tasks as soon as the
//! ISR returns, and PendSV has nothing to do.)
//!
//! Also provides [`bind_trampolines!`], which generates the vector handlers
//! that call into a static `Trampolines`, and re-exports [`CsBusLock`] for
//! buses guarded by `critical-section`. The critical-section implementation
//! itself comes from the application (for a single-core part, `cortex-m`'s
//! `critical-section-single-core` feature).

#![deny(dead_code)]
#![cfg_attr(not(test), no_std)]

use paxirq::Port;

pub use paxirq;
pub use paxirq::CsBusLock;

/// Requests a context switch by pending PendSV.
#[derive(Copy, Clone, Debug, Default)]
pub struct PendSv;

impl Port for PendSv {
    #[inline(always)]
    fn yield_from_isr(&self) {
        cortex_m::peripheral::SCB::set_pendsv();
        // Make sure the pend has landed before the ISR's exception return.
        cortex_m::asm::dsb();
    }
}

/// Binds interrupt vectors to trampolines.
///
/// Each `VECTOR => trampoline` pair generates the device interrupt handler
/// `VECTOR`, overriding the `cortex-m-rt` default, whose entire body is a
/// call to that trampoline on the given static `Trampolines`. Only
/// trampolines compiled into `paxirq` can be named.
///
/// ```ignore
/// static EVENTS: Channel = Channel::new();
/// static IRQS: Trampolines<'static, PendSv> = Trampolines::new(&EVENTS, PendSv);
///
/// paxirq_cortex_m::bind_trampolines!(IRQS;
///     TIMER_IRQ_0 => display,
///     IO_IRQ_BANK0 => button,
///     UART1_IRQ => gps,
/// );
/// ```
///
/// Clearing the peripheral's own interrupt flag is still the board's job;
/// if it needs doing in the ISR, write the handler by hand and call the
/// trampoline at the end.
#[macro_export]
macro_rules! bind_trampolines {
    ($irqs:path; $($vector:ident => $trampoline:ident),* $(,)?) => {
        $(
            #[allow(non_snake_case)]
            #[no_mangle]
            unsafe extern "C" fn $vector() {
                $irqs.$trampoline();
            }
        )*
    };
}
