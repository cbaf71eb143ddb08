//! Event sequencer.

use crate::clock::{ClockWatcher, EventWatcher};

/// Steps through a fixed script, one slot per tick, wrapping at the end.
///
/// Empty slots (`None`) are silent ticks.
pub struct Sequencer<E> {
    script: Vec<Option<E>>,
    position: usize,
    watchers: Vec<Box<dyn EventWatcher<E>>>,
}

impl<E> Sequencer<E> {
    pub fn new(script: Vec<Option<E>>) -> Self {
        Self {
            script,
            position: 0,
            watchers: Vec::new(),
        }
    }

    /// Index of the slot the next tick will play.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    /// Go back to the first slot.
    pub fn restart(&mut self) {
        self.position = 0;
    }

    pub fn add_watcher<W: EventWatcher<E> + 'static>(&mut self, watcher: W) {
        self.watchers.push(Box::new(watcher));
    }
}

impl<E> ClockWatcher for Sequencer<E> {
    fn start(&mut self) {
        self.restart();
    }

    fn tick(&mut self) {
        if self.script.is_empty() {
            return;
        }
        if let Some(event) = &self.script[self.position] {
            for watcher in &mut self.watchers {
                watcher.notify(event);
            }
        }
        self.position = (self.position + 1) % self.script.len();
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for Sequencer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("script", &self.script)
            .field("position", &self.position)
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Heard(Vec<char>);

    impl EventWatcher<char> for Heard {
        fn notify(&mut self, event: &char) {
            self.0.push(*event);
        }
    }

    #[test]
    fn test_skips_empty_slots_and_wraps() {
        let heard = Rc::new(RefCell::new(Heard::default()));
        let mut sequencer = Sequencer::new(vec![Some('a'), None, Some('c'), None, Some('e')]);
        sequencer.add_watcher(Rc::clone(&heard));

        for _ in 0..5 {
            sequencer.tick();
        }
        assert_eq!(heard.borrow().0, vec!['a', 'c', 'e']);
        assert_eq!(sequencer.position(), 0);

        for _ in 0..7 {
            sequencer.tick();
        }
        assert_eq!(heard.borrow().0, vec!['a', 'c', 'e', 'a', 'c', 'e', 'a']);
        assert_eq!(sequencer.position(), 2);
    }

    #[test]
    fn test_start_restarts_script() {
        let heard = Rc::new(RefCell::new(Heard::default()));
        let mut sequencer = Sequencer::new(vec![Some('x'), Some('y')]);
        sequencer.add_watcher(Rc::clone(&heard));

        sequencer.tick();
        sequencer.start();
        sequencer.tick();

        assert_eq!(heard.borrow().0, vec!['x', 'x']);
    }

    #[test]
    fn test_empty_script_is_silent() {
        let mut sequencer: Sequencer<char> = Sequencer::new(Vec::new());
        sequencer.tick();
        assert!(sequencer.is_empty());
        assert_eq!(sequencer.position(), 0);
    }
}
