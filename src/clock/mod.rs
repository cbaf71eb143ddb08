//! Clock-driven sequencing.
//!
//! One oscillator tick fans out to everything registered on it:
//! - [`Divider`] - passes on one tick in every `period`
//! - [`Sequencer`] - steps through a cyclic script of optional events
//! - [`FrameSequencer`] - a divider driving a sequencer, e.g. the APU frame counter
//!
//! Fan-out is synchronous and in registration order.

pub mod divider;
pub mod sequencer;
pub mod frame_sequencer;

use std::cell::RefCell;
use std::rc::Rc;

pub use divider::Divider;
pub use sequencer::Sequencer;
pub use frame_sequencer::{FrameEvent, FrameSequencer, FRAME_STEP_PERIOD};

/// Anything driven by the emulated oscillator.
pub trait ClockWatcher {
    /// The clock is about to start ticking.
    fn start(&mut self) {}

    /// One clock pulse.
    fn tick(&mut self);

    /// The clock stopped.
    fn stop(&mut self) {}
}

/// Receives the events a [`Sequencer`] emits.
pub trait EventWatcher<E> {
    fn notify(&mut self, event: &E);
}

impl<W: ClockWatcher + ?Sized> ClockWatcher for Rc<RefCell<W>> {
    fn start(&mut self) {
        self.borrow_mut().start();
    }

    fn tick(&mut self) {
        self.borrow_mut().tick();
    }

    fn stop(&mut self) {
        self.borrow_mut().stop();
    }
}

impl<E, W: EventWatcher<E> + ?Sized> EventWatcher<E> for Rc<RefCell<W>> {
    fn notify(&mut self, event: &E) {
        self.borrow_mut().notify(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Lifecycle {
        calls: Vec<&'static str>,
    }

    impl ClockWatcher for Lifecycle {
        fn start(&mut self) {
            self.calls.push("start");
        }

        fn tick(&mut self) {
            self.calls.push("tick");
        }

        fn stop(&mut self) {
            self.calls.push("stop");
        }
    }

    #[test]
    fn test_shared_watcher_forwards_every_call() {
        let shared = Rc::new(RefCell::new(Lifecycle::default()));
        let mut handle = Rc::clone(&shared);

        handle.start();
        handle.tick();
        handle.stop();

        assert_eq!(shared.borrow().calls, vec!["start", "tick", "stop"]);
    }
}
