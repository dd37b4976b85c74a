use std::time::Duration;

use tokio::time::{self, Instant};

use crate::lightstate::SharedState;

/// How far behind schedule a cycle may be before the timer gives up and resyncs.
pub const DRIFT_LIMIT: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleConfig {
    pub beats_per_cycle: Option<u32>,
    pub interval_override: Option<Duration>,
}

impl ScheduleConfig {
    pub fn beats(beats_per_cycle: u32) -> ScheduleConfig {
        ScheduleConfig {
            beats_per_cycle: Some(beats_per_cycle),
            interval_override: None,
        }
    }

    pub fn fixed(interval: Duration) -> ScheduleConfig {
        ScheduleConfig {
            beats_per_cycle: None,
            interval_override: Some(interval),
        }
    }

    pub fn interval(&self, tempo: u32) -> Duration {
        if let Some(interval) = self.interval_override {
            return interval;
        }

        let beat = 60.0 / tempo.max(1) as f64;
        Duration::from_secs_f64(beat * self.beats_per_cycle.unwrap_or(1) as f64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleCursor {
    pub anchor: Instant,
    pub cycle: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cycle {
    Fire,
    Skip,
}

/// Anchored cycle timer. Cycle `n` is due at `anchor + n * interval`, so
/// lateness in one cycle does not push back the following ones.
pub struct IntervalTimer {
    config: ScheduleConfig,
    state: SharedState,
    tempo: u32,
    interval: Duration,
    cursor: Option<ScheduleCursor>,
}

impl IntervalTimer {
    pub fn new(config: ScheduleConfig, state: SharedState) -> IntervalTimer {
        let tempo = state.tempo();

        IntervalTimer {
            config,
            state,
            tempo,
            interval: config.interval(tempo),
            cursor: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[cfg(test)]
    pub fn cursor(&self) -> Option<ScheduleCursor> {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = Some(ScheduleCursor {
            anchor: Instant::now(),
            cycle: 0,
        });
    }

    /// Sleeps until the next cycle is due. Returns `Cycle::Skip` after a
    /// resync, in which case the caller must not fire this round.
    pub async fn wait_for_next_cycle(&mut self) -> Cycle {
        if self.cursor.is_none() {
            self.reset();
        }
        let cursor = match self.cursor.as_mut() {
            Some(cursor) => cursor,
            None => return Cycle::Skip,
        };

        let target = cursor.anchor + self.interval * cursor.cycle;
        let now = Instant::now();

        if target > now {
            time::sleep_until(target).await;
        } else if now - target > DRIFT_LIMIT {
            log::debug!("resync: {:.1}ms behind", (now - target).as_secs_f64() * 1000.0);
            *cursor = ScheduleCursor {
                anchor: now,
                cycle: 0,
            };
            return Cycle::Skip;
        }

        cursor.cycle += 1;
        Cycle::Fire
    }

    /// Picks up a new live tempo. The phase restarts now rather than trying
    /// to stay continuous with the old grid.
    pub fn check_tempo_changed(&mut self) -> bool {
        if self.config.interval_override.is_some() {
            return false;
        }

        let tempo = self.state.tempo();
        if tempo == self.tempo || tempo == 0 {
            return false;
        }

        self.tempo = tempo;
        self.interval = self.config.interval(tempo);
        self.reset();
        log::info!(
            "Tempo changed to {} BPM, interval: {:.1}ms",
            tempo,
            self.interval.as_secs_f64() * 1000.0
        );
        true
    }
}
