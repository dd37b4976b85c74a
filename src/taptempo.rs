use std::collections::VecDeque;

use tokio::time::Instant;

use crate::lightstate::{SharedState, MAX_TEMPO, MIN_TEMPO};

pub const TAP_BUFFER: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapOutcome {
    NeedMoreTaps { taps: usize },
    Tempo { bpm: u32, taps: usize },
}

pub struct TapTempo {
    taps: VecDeque<Instant>,
}

impl TapTempo {
    pub fn new() -> TapTempo {
        TapTempo {
            taps: VecDeque::with_capacity(TAP_BUFFER),
        }
    }

    pub fn tap(&mut self, at: Instant) -> TapOutcome {
        if self.taps.len() == TAP_BUFFER {
            self.taps.pop_front();
        }
        self.taps.push_back(at);

        match self.estimate() {
            Some(bpm) => TapOutcome::Tempo {
                bpm,
                taps: self.taps.len(),
            },
            None => TapOutcome::NeedMoreTaps {
                taps: self.taps.len(),
            },
        }
    }

    /// Records a tap and publishes the estimate, if there is one.
    pub fn tap_and_publish(&mut self, at: Instant, state: &SharedState) -> TapOutcome {
        let outcome = self.tap(at);
        if let TapOutcome::Tempo { bpm, .. } = outcome {
            state.publish_tempo(bpm);
        }
        outcome
    }

    fn estimate(&self) -> Option<u32> {
        if self.taps.len() < 2 {
            return None;
        }

        let intervals: Vec<f64> = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(earlier, later)| later.saturating_duration_since(*earlier).as_secs_f64())
            .collect();
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if mean <= 0.0 {
            return Some(MAX_TEMPO);
        }

        let bpm = (60.0 / mean).round();
        Some((bpm.min(MAX_TEMPO as f64) as u32).clamp(MIN_TEMPO, MAX_TEMPO))
    }
}
