//! Elapsed-time tracking and the pomodoro countdown.
//!
//! Both are driven by the host calling `tick` once per second. Elapsed time
//! counts ticks, not wall-clock deltas, so a delayed tick is time lost.

use serde::Serialize;

/// Start/pause handle for an elapsed-seconds accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElapsedTimer {
    running: bool,
}

impl ElapsedTimer {
    pub fn new() -> Self {
        ElapsedTimer::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns false if it was already running
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    /// Returns false if it was not running
    pub fn pause(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Add one second to `accumulator` if running
    pub fn tick(&self, accumulator: &mut u64) -> bool {
        if self.running {
            *accumulator = accumulator.saturating_add(1);
        }
        self.running
    }
}

/// `H:MM:SS`, or `MM:SS` under an hour
pub fn format_elapsed(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Result of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Idle,
    Running { remaining: u32 },
    /// Reached zero on this tick; the countdown stops itself
    Finished,
}

/// Longest pomodoro preset, one day. Longer requests are cut to this.
pub const MAX_PRESET_MINUTES: u32 = 24 * 60;

/// Pomodoro countdown. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countdown {
    preset_minutes: u32,
    remaining: u32,
    running: bool,
}

impl Countdown {
    pub fn new(preset_minutes: u32) -> Self {
        let preset_minutes = preset_minutes.min(MAX_PRESET_MINUTES);
        Countdown {
            preset_minutes,
            remaining: preset_minutes * 60,
            running: false,
        }
    }

    /// Switch preset; stops and refills the countdown
    pub fn set_preset(&mut self, minutes: u32) {
        *self = Countdown::new(minutes);
    }

    pub fn preset_minutes(&self) -> u32 {
        self.preset_minutes
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns false if already running or nothing is left
    pub fn start(&mut self) -> bool {
        if self.running || self.remaining == 0 {
            return false;
        }
        self.running = true;
        true
    }

    pub fn pause(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    pub fn reset(&mut self) {
        self.set_preset(self.preset_minutes);
    }

    pub fn tick(&mut self) -> CountdownTick {
        if !self.running {
            return CountdownTick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            CountdownTick::Finished
        } else {
            CountdownTick::Running {
                remaining: self.remaining,
            }
        }
    }

    /// `MM:SS`
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_pause_are_idempotent() {
        let mut t = ElapsedTimer::new();
        assert!(!t.pause());
        assert!(t.start());
        assert!(!t.start());
        assert!(t.pause());
        assert!(!t.pause());
    }

    #[test]
    fn ticks_only_count_while_running() {
        let mut t = ElapsedTimer::new();
        let mut secs = 10;
        assert!(!t.tick(&mut secs));
        t.start();
        t.tick(&mut secs);
        t.tick(&mut secs);
        t.pause();
        t.tick(&mut secs);
        assert_eq!(secs, 12);
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(75), "01:15");
        assert_eq!(format_elapsed(3600 + 62), "1:01:02");
    }

    #[test]
    fn countdown_runs_to_zero_and_stops() {
        let mut c = Countdown::new(1);
        assert_eq!(c.display(), "01:00");
        assert_eq!(c.tick(), CountdownTick::Idle);
        assert!(c.start());
        assert!(!c.start());
        for _ in 0..59 {
            assert!(matches!(c.tick(), CountdownTick::Running { .. }));
        }
        assert_eq!(c.display(), "00:01");
        assert_eq!(c.tick(), CountdownTick::Finished);
        assert!(!c.is_running());
        assert_eq!(c.tick(), CountdownTick::Idle);
        assert!(!c.start());
    }

    #[test]
    fn huge_preset_is_cut_to_a_day() {
        let c = Countdown::new(80_000_000);
        assert_eq!(c.preset_minutes(), MAX_PRESET_MINUTES);
        assert_eq!(c.remaining(), MAX_PRESET_MINUTES * 60);

        let mut c = Countdown::new(5);
        c.set_preset(u32::MAX);
        assert_eq!(c.remaining(), 86_400);
    }

    #[test]
    fn elapsed_saturates_instead_of_wrapping() {
        let mut t = ElapsedTimer::new();
        t.start();
        let mut acc = u64::MAX;
        assert!(t.tick(&mut acc));
        assert_eq!(acc, u64::MAX);
    }

    #[test]
    fn preset_change_stops_and_refills() {
        let mut c = Countdown::new(25);
        c.start();
        c.tick();
        c.set_preset(5);
        assert!(!c.is_running());
        assert_eq!(c.display(), "05:00");
        c.start();
        c.tick();
        c.reset();
        assert_eq!(c.remaining(), 300);
    }
}
