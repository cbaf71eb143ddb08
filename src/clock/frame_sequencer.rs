//! Frame sequencer: a divider feeding a sequencer.
//!
//! The NES APU frame counter is the motivating case. It sees the CPU
//! clock, divides it down to roughly 240 Hz and on each of those steps
//! clocks the envelope, length and sweep units according to a 4-step or
//! 5-step pattern.

use std::cell::RefCell;
use std::rc::Rc;
use serde::{Serialize, Deserialize};
use crate::clock::{ClockWatcher, Divider, EventWatcher, Sequencer};

/// CPU cycles between APU frame steps (NTSC).
pub const FRAME_STEP_PERIOD: u32 = 7457;

/// What one APU frame step clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameEvent {
    /// Envelopes and the triangle's linear counter.
    Quarter,
    /// Everything `Quarter` clocks, plus length counters and sweeps.
    Half,
    /// `Half`, and the frame interrupt is raised.
    HalfWithInterrupt,
}

impl FrameEvent {
    pub const fn clocks_length(self) -> bool {
        matches!(self, FrameEvent::Half | FrameEvent::HalfWithInterrupt)
    }

    pub const fn raises_interrupt(self) -> bool {
        matches!(self, FrameEvent::HalfWithInterrupt)
    }
}

/// A [`Sequencer`] that advances once per divided clock pulse.
pub struct FrameSequencer<E: 'static> {
    divider: Divider,
    sequencer: Rc<RefCell<Sequencer<E>>>,
}

impl<E: 'static> FrameSequencer<E> {
    /// Step through `script` once every `period` input ticks.
    pub fn new(period: u32, script: Vec<Option<E>>) -> Self {
        let sequencer = Rc::new(RefCell::new(Sequencer::new(script)));
        let mut divider = Divider::new(period);
        divider.add_watcher(Rc::clone(&sequencer));
        Self { divider, sequencer }
    }

    pub fn add_watcher<W: EventWatcher<E> + 'static>(&mut self, watcher: W) {
        self.sequencer.borrow_mut().add_watcher(watcher);
    }

    pub fn set_period(&mut self, period: u32) {
        self.divider.set_period(period);
    }

    pub fn divider(&self) -> &Divider {
        &self.divider
    }

    /// Script slot the next divided pulse will play.
    pub fn position(&self) -> usize {
        self.sequencer.borrow().position()
    }
}

impl FrameSequencer<FrameEvent> {
    /// The APU's 4-step mode: Q, H, Q, H + IRQ.
    pub fn four_step(period: u32) -> Self {
        Self::new(period, vec![
            Some(FrameEvent::Quarter),
            Some(FrameEvent::Half),
            Some(FrameEvent::Quarter),
            Some(FrameEvent::HalfWithInterrupt),
        ])
    }

    /// The APU's 5-step mode: Q, H, Q, -, H. Never interrupts.
    pub fn five_step(period: u32) -> Self {
        Self::new(period, vec![
            Some(FrameEvent::Quarter),
            Some(FrameEvent::Half),
            Some(FrameEvent::Quarter),
            None,
            Some(FrameEvent::Half),
        ])
    }
}

impl<E: 'static> ClockWatcher for FrameSequencer<E> {
    fn start(&mut self) {
        self.divider.start();
    }

    fn tick(&mut self) {
        self.divider.tick();
    }

    fn stop(&mut self) {
        self.divider.stop();
    }
}

impl<E: 'static> std::fmt::Debug for FrameSequencer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSequencer")
            .field("divider", &self.divider)
            .field("position", &self.position())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<(u32, FrameEvent)>, u32);

    impl EventWatcher<FrameEvent> for Log {
        fn notify(&mut self, event: &FrameEvent) {
            let tick = self.1;
            self.0.push((tick, *event));
        }
    }

    fn run(frame: &mut FrameSequencer<FrameEvent>, log: &Rc<RefCell<Log>>, ticks: u32) {
        for _ in 0..ticks {
            log.borrow_mut().1 += 1;
            frame.tick();
        }
    }

    #[test]
    fn test_advances_once_per_divided_pulse() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut frame = FrameSequencer::four_step(10);
        frame.add_watcher(Rc::clone(&log));
        frame.start();

        run(&mut frame, &log, 45);

        assert_eq!(log.borrow().0, vec![
            (10, FrameEvent::Quarter),
            (20, FrameEvent::Half),
            (30, FrameEvent::Quarter),
            (40, FrameEvent::HalfWithInterrupt),
        ]);
        assert_eq!(frame.position(), 0);
        assert_eq!(frame.divider().countdown(), 5);
    }

    #[test]
    fn test_five_step_has_silent_slot_and_no_interrupt() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut frame = FrameSequencer::five_step(2);
        frame.add_watcher(Rc::clone(&log));

        run(&mut frame, &log, 12);

        let ticks: Vec<u32> = log.borrow().0.iter().map(|(tick, _)| *tick).collect();
        assert_eq!(ticks, vec![2, 4, 6, 10, 12]);
        assert!(log.borrow().0.iter().all(|(_, event)| !event.raises_interrupt()));
    }

    #[test]
    fn test_event_meaning() {
        assert!(!FrameEvent::Quarter.clocks_length());
        assert!(FrameEvent::Half.clocks_length());
        assert!(FrameEvent::HalfWithInterrupt.raises_interrupt());
    }

    #[test]
    fn test_custom_events() {
        struct Count(Rc<RefCell<u32>>);
        impl EventWatcher<&'static str> for Count {
            fn notify(&mut self, _event: &&'static str) {
                *self.0.borrow_mut() += 1;
            }
        }

        let count = Rc::new(RefCell::new(0));
        let mut frame = FrameSequencer::new(FRAME_STEP_PERIOD, vec![Some("step")]);
        frame.add_watcher(Count(Rc::clone(&count)));

        for _ in 0..FRAME_STEP_PERIOD * 3 {
            frame.tick();
        }
        assert_eq!(*count.borrow(), 3);
    }
}
