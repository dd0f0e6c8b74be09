// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The dispatch task.
//!
//! A [`Dispatcher`] owns the [`Receiver`] of the event channel and runs
//! forever: wait for a notification, decide whether handling is currently
//! suppressed, and if not, call the handler for every event bit present.
//!
//! # Suppression
//!
//! The dispatcher is either [`State::Active`] or [`State::Suppressed`]. On
//! each notification, in this order:
//!
//! 1. `UNMASK` present: become Active. Nothing else in this notification is
//!    handled.
//! 2. Suppressed: drop the notification.
//! 3. `MASK` present: become Suppressed and drop the notification, including
//!    any event bits that came along with it.
//! 4. Otherwise, route each event bit to its handler.
//!
//! The state lives in the dispatcher itself. Nothing else can read or write
//! it; other code can only ask for a change by posting a control bit through
//! [`MaskControl`][crate::mask::MaskControl].
//!
//! # Routing
//!
//! Handlers run in a fixed order regardless of which bit was posted first:
//! button, display, matrix display, GPS, housekeeping, time sync, send cycle.
//! Each handler runs to completion before the next bit is looked at. The
//! order and the set of enabled routes are fixed when the dispatcher is built
//! from its [`Config`].

use core::convert::Infallible;

use crate::channel::Receiver;
use crate::config::Config;
use crate::events::Events;

/// The application's event handlers.
///
/// These are called synchronously from the dispatch task, never from
/// interrupt context. A handler's failures are its own business; the
/// dispatcher doesn't look at results and doesn't retry.
///
/// Handlers for optional hardware default to doing nothing, so a board only
/// implements what it has.
pub trait Handlers {
    /// Whatever the GPS driver wants passed along when storing a fix.
    /// Boards without GPS can use `()`.
    type GpsStatus: Default;

    /// Reads and debounces the button.
    fn read_button(&mut self) {}

    /// Redraws the display.
    fn refresh_display(&mut self) {}

    /// Redraws the LED matrix.
    fn refresh_matrix_display(&mut self) {}

    /// Current GPS status, read just before storing the location.
    fn gps_status(&self) -> Self::GpsStatus {
        Self::GpsStatus::default()
    }

    /// Stores the current GPS location.
    fn store_gps_location(&mut self, _status: Self::GpsStatus) {}

    /// Periodic housekeeping.
    fn housekeeping(&mut self);

    /// Sends the payload.
    fn send_payload(&mut self);
}

/// External clock source and the local clock it corrects.
pub trait TimeSync {
    /// A reading from the external source.
    type Time;

    /// Brings the local time reference up to date before a sync.
    fn refresh(&mut self);

    /// Asks the external source for the time.
    fn query(&mut self) -> Self::Time;

    /// Judges whether a reading is good enough to apply.
    fn is_valid(&self, time: &Self::Time) -> bool;

    /// Sets the local clock.
    fn apply(&mut self, time: Self::Time);
}

/// [`TimeSync`] for builds that don't sync time.
///
/// Every reading is invalid, so nothing is ever applied.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoTimeSync;

impl TimeSync for NoTimeSync {
    type Time = ();

    fn refresh(&mut self) {}

    fn query(&mut self) {}

    fn is_valid(&self, _time: &()) -> bool {
        false
    }

    fn apply(&mut self, _time: ()) {}
}

/// Whether the dispatcher is handling events.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Events are routed to handlers.
    #[default]
    Active,
    /// Events are dropped until an unmask request arrives.
    Suppressed,
}

/// What one call to [`Dispatcher::dispatch`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An unmask request was seen; the dispatcher is Active. Other bits in the
    /// same notification were not handled.
    Resumed,
    /// The dispatcher was Suppressed and dropped the notification.
    Dropped,
    /// A mask request was seen; the dispatcher is now Suppressed. Other bits
    /// in the same notification were not handled.
    Suppressed,
    /// These events were routed to their handlers. May be empty if nothing
    /// present had an enabled route.
    Handled(Events),
}

#[cfg(feature = "defmt")]
impl defmt::Format for Outcome {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Outcome::Resumed => defmt::write!(f, "Resumed"),
            Outcome::Dropped => defmt::write!(f, "Dropped"),
            Outcome::Suppressed => defmt::write!(f, "Suppressed"),
            Outcome::Handled(e) => defmt::write!(f, "Handled({=u32:#x})", e.bits()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Action {
    Button,
    Display,
    MatrixDisplay,
    Gps,
    Housekeeping,
    TimeSync,
    SendCycle,
}

#[derive(Copy, Clone, Debug)]
struct Route {
    event: Events,
    enabled: bool,
    action: Action,
}

const ROUTES: usize = 7;

/// Builds the route table, in dispatch order.
const fn routes(config: &Config) -> [Route; ROUTES] {
    [
        Route { event: Events::BUTTON, enabled: config.button(), action: Action::Button },
        Route { event: Events::DISPLAY, enabled: config.display(), action: Action::Display },
        Route {
            event: Events::MATRIX_DISPLAY,
            enabled: config.matrix_display(),
            action: Action::MatrixDisplay,
        },
        Route { event: Events::GPS, enabled: config.gps(), action: Action::Gps },
        Route { event: Events::CYCLIC, enabled: true, action: Action::Housekeeping },
        Route { event: Events::TIME_SYNC, enabled: config.time_sync(), action: Action::TimeSync },
        Route { event: Events::SEND_CYCLE, enabled: true, action: Action::SendCycle },
    ]
}

/// The dispatch task.
pub struct Dispatcher<'c, H, T = NoTimeSync> {
    receiver: Receiver<'c>,
    routes: [Route; ROUTES],
    state: State,
    handlers: H,
    time: T,
}

impl<'c, H: Handlers> Dispatcher<'c, H, NoTimeSync> {
    /// Creates a dispatcher that drains `receiver` into `handlers`, with no
    /// time source. If `config` enables time sync, the events are still
    /// routed, but to [`NoTimeSync`], which never changes the clock.
    pub fn new(receiver: Receiver<'c>, config: Config, handlers: H) -> Self {
        Self::with_time_sync(receiver, config, handlers, NoTimeSync)
    }
}

impl<'c, H: Handlers, T: TimeSync> Dispatcher<'c, H, T> {
    /// Creates a dispatcher that also keeps the clock in sync with `time`.
    pub fn with_time_sync(receiver: Receiver<'c>, config: Config, handlers: H, time: T) -> Self {
        let routes = routes(&config);
        debug!("dispatcher up, routes {:#x}", enabled_bits(&routes));
        Self {
            receiver,
            routes,
            state: State::Active,
            handlers,
            time,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> State {
        self.state
    }

    /// The events this dispatcher will route when Active.
    pub fn routed(&self) -> Events {
        Events::from_bits_truncate(enabled_bits(&self.routes))
    }

    /// Shared access to the handlers.
    pub fn handlers(&self) -> &H {
        &self.handlers
    }

    /// Exclusive access to the handlers.
    pub fn handlers_mut(&mut self) -> &mut H {
        &mut self.handlers
    }

    /// Handles one notification. This is the body of [`run`][Self::run],
    /// exposed so that polling boards can drive it from their own loop.
    pub fn dispatch(&mut self, events: Events) -> Outcome {
        if events.contains(Events::UNMASK) {
            if self.state == State::Suppressed {
                debug!("unmasked");
            }
            self.state = State::Active;
            return Outcome::Resumed;
        }
        if self.state == State::Suppressed {
            trace!("suppressed, dropping {:#x}", events.bits());
            return Outcome::Dropped;
        }
        if events.contains(Events::MASK) {
            debug!("masked, dropping {:#x}", events.bits());
            self.state = State::Suppressed;
            return Outcome::Suppressed;
        }

        let mut handled = Events::empty();
        for route in self.routes {
            if route.enabled && events.contains(route.event) {
                self.invoke(route.action);
                handled |= route.event;
            }
        }
        Outcome::Handled(handled)
    }

    fn invoke(&mut self, action: Action) {
        match action {
            Action::Button => self.handlers.read_button(),
            Action::Display => self.handlers.refresh_display(),
            Action::MatrixDisplay => self.handlers.refresh_matrix_display(),
            Action::Gps => {
                let status = self.handlers.gps_status();
                self.handlers.store_gps_location(status);
            }
            Action::Housekeeping => self.handlers.housekeeping(),
            Action::TimeSync => self.sync_time(),
            Action::SendCycle => self.handlers.send_payload(),
        }
    }

    fn sync_time(&mut self) {
        self.time.refresh();
        let t = self.time.query();
        if self.time.is_valid(&t) {
            self.time.apply(t);
        } else {
            // Not retried; the next sync event gets another go.
            debug!("time source reading invalid, discarded");
        }
    }

    /// Runs the dispatch loop forever.
    ///
    /// This is a task in the lilos sense: hand it to the executor once at
    /// startup. It parks whenever the channel is empty.
    pub async fn run(mut self) -> Infallible {
        loop {
            let events = self.receiver.receive().await;
            let _outcome = self.dispatch(events);
            trace!("dispatched {:#x}: {:?}", events.bits(), _outcome);
        }
    }
}

fn enabled_bits(routes: &[Route; ROUTES]) -> u32 {
    routes
        .iter()
        .filter(|r| r.enabled)
        .fold(0, |bits, r| bits | r.event.bits())
}
