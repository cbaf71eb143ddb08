//! Clock divider.

use crate::clock::ClockWatcher;

/// Passes one tick on to its watchers for every `period` ticks it receives.
///
/// The divider counts ticks since it last fired and fires once
/// `period - elapsed` drops below 1. Because the comparison uses the
/// current period, changing the period mid-cycle moves the pending
/// output tick right away: lowering it below the ticks already counted
/// fires on the very next tick. A period of 0 or 1 fires on every tick.
pub struct Divider {
    period: u32,
    elapsed: u32,
    watchers: Vec<Box<dyn ClockWatcher>>,
}

impl Divider {
    pub fn new(period: u32) -> Self {
        Self {
            period,
            elapsed: 0,
            watchers: Vec::new(),
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Change the period. Ticks already counted still count.
    pub fn set_period(&mut self, period: u32) {
        self.period = period;
    }

    /// Ticks left before the next output tick, at the current period.
    pub fn countdown(&self) -> u32 {
        self.period.saturating_sub(self.elapsed)
    }

    /// Start counting a fresh period.
    pub fn restart(&mut self) {
        self.elapsed = 0;
    }

    /// Register a watcher. Watchers are ticked in registration order.
    pub fn add_watcher<W: ClockWatcher + 'static>(&mut self, watcher: W) {
        self.watchers.push(Box::new(watcher));
    }
}

impl ClockWatcher for Divider {
    fn start(&mut self) {
        self.restart();
        for watcher in &mut self.watchers {
            watcher.start();
        }
    }

    fn tick(&mut self) {
        self.elapsed = self.elapsed.saturating_add(1);
        if self.period.saturating_sub(self.elapsed) < 1 {
            self.elapsed = 0;
            for watcher in &mut self.watchers {
                watcher.tick();
            }
        }
    }

    fn stop(&mut self) {
        for watcher in &mut self.watchers {
            watcher.stop();
        }
    }
}

impl std::fmt::Debug for Divider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Divider")
            .field("period", &self.period)
            .field("countdown", &self.countdown())
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records the input tick number each output tick arrived on.
    struct Recorder {
        clock: Rc<RefCell<u32>>,
        fired_at: Rc<RefCell<Vec<u32>>>,
    }

    impl ClockWatcher for Recorder {
        fn tick(&mut self) {
            self.fired_at.borrow_mut().push(*self.clock.borrow());
        }
    }

    fn divider_with_recorder(period: u32) -> (Divider, Rc<RefCell<u32>>, Rc<RefCell<Vec<u32>>>) {
        let clock = Rc::new(RefCell::new(0));
        let fired_at = Rc::new(RefCell::new(Vec::new()));
        let mut divider = Divider::new(period);
        divider.add_watcher(Recorder {
            clock: Rc::clone(&clock),
            fired_at: Rc::clone(&fired_at),
        });
        (divider, clock, fired_at)
    }

    fn run(divider: &mut Divider, clock: &Rc<RefCell<u32>>, ticks: u32) {
        for _ in 0..ticks {
            *clock.borrow_mut() += 1;
            divider.tick();
        }
    }

    #[test]
    fn test_fires_every_period() {
        let (mut divider, clock, fired_at) = divider_with_recorder(3);
        assert_eq!(divider.countdown(), 3);

        run(&mut divider, &clock, 10);

        assert_eq!(*fired_at.borrow(), vec![3, 6, 9]);
        assert_eq!(divider.countdown(), 2);
    }

    #[test]
    fn test_period_change_applies_to_pending_countdown() {
        let (mut divider, clock, fired_at) = divider_with_recorder(3);
        run(&mut divider, &clock, 2);

        // Two ticks already counted against a period of 5: three to go.
        divider.set_period(5);
        assert_eq!(divider.countdown(), 3);
        run(&mut divider, &clock, 2);
        assert!(fired_at.borrow().is_empty());
        run(&mut divider, &clock, 1);
        assert_eq!(*fired_at.borrow(), vec![5]);

        // Shortening below the ticks already counted fires on the next tick.
        run(&mut divider, &clock, 3);
        divider.set_period(2);
        run(&mut divider, &clock, 1);
        assert_eq!(*fired_at.borrow(), vec![5, 9]);
    }

    #[test]
    fn test_small_periods_fire_every_tick() {
        for period in [0, 1] {
            let (mut divider, clock, fired_at) = divider_with_recorder(period);
            run(&mut divider, &clock, 4);
            assert_eq!(*fired_at.borrow(), vec![1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_watchers_in_registration_order() {
        struct Tag(&'static str, Rc<RefCell<Vec<&'static str>>>);
        impl ClockWatcher for Tag {
            fn tick(&mut self) {
                self.1.borrow_mut().push(self.0);
            }
        }

        let order = Rc::new(RefCell::new(Vec::new()));
        let mut divider = Divider::new(1);
        divider.add_watcher(Tag("first", Rc::clone(&order)));
        divider.add_watcher(Tag("second", Rc::clone(&order)));
        divider.tick();

        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_start_restarts_count() {
        let (mut divider, clock, fired_at) = divider_with_recorder(3);
        run(&mut divider, &clock, 2);
        divider.start();
        run(&mut divider, &clock, 2);
        assert!(fired_at.borrow().is_empty());
        run(&mut divider, &clock, 1);
        assert_eq!(*fired_at.borrow(), vec![5]);
    }
}
