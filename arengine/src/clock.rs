use crate::units::{Ticks, Time};
use chrono::Timelike;
use std::time::{Duration, Instant};

/// Source of the engine's frame timestamps.
pub trait Clock {
    fn now(&self) -> Ticks;

    /// Local wall-clock minute in `0..1440`, used by time-window animations.
    fn minute_of_day(&self) -> u32;
}

/// Monotonic ticks since construction, local wall clock for the time of day.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Ticks {
        let elapsed = Instant::now().duration_since(self.origin);
        Ticks::from_time(Time::from_std_duration(elapsed))
    }

    fn minute_of_day(&self) -> u32 {
        let now = chrono::Local::now();
        now.hour() * 60 + now.minute()
    }
}

/// Clock driven by hand, for replays and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Ticks,
    minute_of_day: u32,
}

impl ManualClock {
    pub fn new(minute_of_day: u32) -> Self {
        ManualClock {
            now: Ticks::ZERO,
            minute_of_day: minute_of_day % poidsl::MINUTES_PER_DAY,
        }
    }

    /// Moves the clock forward, rolling the time of day over midnight.
    pub fn advance(&mut self, dt: Time) {
        let before = self.now.as_secs();
        self.now += Ticks::from_time(dt);
        let whole_minutes = (self.now.as_secs() / 60.0).floor() - (before / 60.0).floor();
        self.minute_of_day =
            (self.minute_of_day + whole_minutes as u32) % poidsl::MINUTES_PER_DAY;
    }

    pub fn set_minute_of_day(&mut self, minute: u32) {
        self.minute_of_day = minute % poidsl::MINUTES_PER_DAY;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Ticks {
        self.now
    }

    fn minute_of_day(&self) -> u32 {
        self.minute_of_day
    }
}

/// Per-frame bookkeeping shared with every engine component.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub start: Ticks,
    pub now: Ticks,
    pub frame_iteration: u64,
    pub minute_of_day: u32,
    pub real_time_start: Instant,
    pub real_time: Duration,
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self::new(Ticks::ZERO)
    }
}

impl FrameInfo {
    pub fn new(start: Ticks) -> Self {
        FrameInfo {
            start,
            now: start,
            frame_iteration: 0,
            minute_of_day: 0,
            real_time_start: Instant::now(),
            real_time: Duration::ZERO,
        }
    }

    /// Time elapsed since the previous frame.
    pub fn frame_step(&mut self, now: Ticks, minute_of_day: u32) -> Time {
        let dt = if self.frame_iteration == 0 {
            Time::default()
        } else {
            (now - self.now).as_time()
        };
        self.frame_iteration += 1;
        self.now = now;
        self.minute_of_day = minute_of_day;
        self.real_time = Instant::now().duration_since(self.real_time_start);
        dt
    }

    pub fn elapsed(&self) -> Time {
        (self.now - self.start).as_time()
    }
}
