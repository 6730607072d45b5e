use std::cell::Cell;

use chrono::{DateTime, Duration, Local, NaiveDate, SecondsFormat, Utc};

/// Source of the current time for `lastActivity`, `lastCompleted`,
/// archive stamps and generated ids.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar date, used for calendar highlighting and export names
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: Cell::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn today(&self) -> NaiveDate {
        self.now.get().date_naive()
    }
}

/// RFC 3339 with second precision, the format every stored timestamp uses
pub fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Generates node ids from a millisecond clock.
///
/// Ids are the decimal millisecond timestamp. Two ids requested within the
/// same millisecond (or after the clock stepped backwards) are bumped past
/// the last one handed out, so a single generator never repeats itself.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator::default()
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        let next = if millis > self.last { millis } else { self.last + 1 };
        self.last = next;
        next.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn ids_follow_the_clock() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_id(at(1_700_000_000)), "1700000000000");
        assert_eq!(ids.next_id(at(1_700_000_001)), "1700000001000");
    }

    #[test]
    fn ids_never_repeat_within_a_millisecond() {
        let mut ids = IdGenerator::new();
        let a = ids.next_id(at(1_700_000_000));
        let b = ids.next_id(at(1_700_000_000));
        let c = ids.next_id(at(1_699_999_999));
        assert_eq!(a, "1700000000000");
        assert_eq!(b, "1700000000001");
        assert_eq!(c, "1700000000002");
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(at(0));
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), at(90));
        assert_eq!(stamp(clock.now()), "1970-01-01T00:01:30Z");
    }
}
