use std::time::{Duration, Instant};

/// Monotonic song time, in seconds since the song started.
pub trait Clock {
    fn current_time_seconds(&self) -> f32;
}

/// A clock that can be driven by the session: started at zero, frozen
/// while paused, and resumed without skipping the paused interval.
pub trait Transport: Clock {
    fn start(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn reset(&mut self);
    fn is_paused(&self) -> bool;
}

/// Wall-clock transport backed by `Instant`.
#[derive(Debug, Clone)]
pub struct SongClock {
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl Default for SongClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SongClock {
    pub fn new() -> Self {
        Self {
            started_at: None,
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        let Some(start) = self.started_at else {
            return Duration::ZERO;
        };
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(start)
            .saturating_sub(self.paused_total)
    }
}

impl Clock for SongClock {
    fn current_time_seconds(&self) -> f32 {
        self.elapsed_at(Instant::now()).as_secs_f32()
    }
}

impl Transport for SongClock {
    fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
    }

    fn pause(&mut self) {
        if self.started_at.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    fn resume(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += Instant::now().saturating_duration_since(paused_at);
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }
}

/// Explicitly stepped transport for replays, simulations and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: f32,
    running: bool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock; ignored unless the transport is running.
    pub fn advance(&mut self, seconds: f32) {
        if self.running && seconds > 0.0 {
            self.time += seconds;
        }
    }

    /// Jumps forward to `seconds`; never moves backwards.
    pub fn set(&mut self, seconds: f32) {
        if self.running && seconds > self.time {
            self.time = seconds;
        }
    }
}

impl Clock for ManualClock {
    fn current_time_seconds(&self) -> f32 {
        self.time
    }
}

impl Transport for ManualClock {
    fn start(&mut self) {
        self.time = 0.0;
        self.running = true;
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn resume(&mut self) {
        self.running = true;
    }

    fn reset(&mut self) {
        self.time = 0.0;
        self.running = false;
    }

    fn is_paused(&self) -> bool {
        !self.running
    }
}
