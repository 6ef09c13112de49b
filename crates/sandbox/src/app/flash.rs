//! Short-lived indicator flags that reset themselves after a fixed duration.

use std::time::{Duration, Instant};

/// Boolean flag that stays on for `duration` after being triggered.
#[derive(Debug, Clone)]
pub struct Flash {
    duration: Duration,
    until: Option<Instant>,
}

impl Flash {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            until: None,
        }
    }

    /// Turn the flag on, restarting the countdown if it was already on.
    pub fn trigger(&mut self, now: Instant) {
        self.until = Some(now + self.duration);
    }

    pub fn is_on(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// Reset the flag once its duration elapsed. Returns `true` when it was reset.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if now >= until => {
                self.until = None;
                true
            }
            _ => false,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Named flags shown by the editor.
#[derive(Debug, Clone)]
pub struct Flashes {
    pub saved: Flash,
    pub checked: Flash,
}

impl Flashes {
    pub fn new(duration: Duration) -> Self {
        Self {
            saved: Flash::new(duration),
            checked: Flash::new(duration),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.saved.tick(now);
        self.checked.tick(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_clears_after_duration() {
        let start = Instant::now();
        let mut flash = Flash::new(Duration::from_millis(500));
        assert!(!flash.is_on(start));

        flash.trigger(start);
        assert!(flash.is_on(start + Duration::from_millis(499)));
        assert!(!flash.tick(start + Duration::from_millis(499)));
        assert!(flash.tick(start + Duration::from_millis(500)));
        assert!(!flash.is_on(start + Duration::from_millis(500)));
        assert!(!flash.tick(start + Duration::from_secs(5)));
    }

    #[test]
    fn retrigger_extends_the_flag() {
        let start = Instant::now();
        let mut flash = Flash::new(Duration::from_millis(500));
        flash.trigger(start);
        flash.trigger(start + Duration::from_millis(400));
        assert!(flash.is_on(start + Duration::from_millis(800)));
    }
}
