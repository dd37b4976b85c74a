use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::colors::{self, Color};
use crate::error::{LightError, Result};

pub const MIN_TEMPO: u32 = 40;
pub const MAX_TEMPO: u32 = 240;
pub const DEFAULT_TEMPO: u32 = 120;

struct LightState {
    tempo: u32,
    colors: Arc<Vec<Color>>,
    colors_version: u64,
}

/// Tempo and color sequence shared between the console and every running loop.
///
/// Loops must take a fresh snapshot each cycle; nothing handed out here is
/// updated in place.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Mutex<LightState>>,
}

pub struct ColorSnapshot {
    pub version: u64,
    pub colors: Arc<Vec<Color>>,
}

impl SharedState {
    pub fn new(tempo: u32, colors: Vec<Color>) -> SharedState {
        let colors = if colors.is_empty() {
            colors::default_colors()
        } else {
            colors
        };

        SharedState {
            inner: Arc::new(Mutex::new(LightState {
                tempo: tempo.clamp(MIN_TEMPO, MAX_TEMPO),
                colors: Arc::new(colors),
                colors_version: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LightState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tempo(&self) -> u32 {
        self.lock().tempo
    }

    pub fn set_tempo(&self, bpm: u32) -> Result<u32> {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&bpm) {
            return Err(LightError::InvalidTempo(bpm.to_string()));
        }

        self.lock().tempo = bpm;
        Ok(bpm)
    }

    /// Publishes a tempo from an estimate, clamping instead of rejecting.
    pub fn publish_tempo(&self, bpm: u32) -> u32 {
        let bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        self.lock().tempo = bpm;
        bpm
    }

    pub fn double_tempo(&self) -> u32 {
        let mut state = self.lock();
        state.tempo = state.tempo.saturating_mul(2).clamp(MIN_TEMPO, MAX_TEMPO);
        state.tempo
    }

    pub fn halve_tempo(&self) -> u32 {
        let mut state = self.lock();
        state.tempo = (state.tempo / 2).clamp(MIN_TEMPO, MAX_TEMPO);
        state.tempo
    }

    pub fn colors(&self) -> ColorSnapshot {
        let state = self.lock();
        ColorSnapshot {
            version: state.colors_version,
            colors: Arc::clone(&state.colors),
        }
    }

    pub fn colors_version(&self) -> u64 {
        self.lock().colors_version
    }

    /// Swaps in a whole new sequence. An empty list leaves the current one alone.
    pub fn replace_colors(&self, colors: Vec<Color>) -> Result<()> {
        if colors.is_empty() {
            return Err(LightError::NoValidColors(Vec::new()));
        }

        let mut state = self.lock();
        state.colors = Arc::new(colors);
        state.colors_version += 1;
        Ok(())
    }
}

pub fn parse_tempo(input: &str) -> Result<u32> {
    match input.trim().parse::<u32>() {
        Ok(bpm) if (MIN_TEMPO..=MAX_TEMPO).contains(&bpm) => Ok(bpm),
        _ => Err(LightError::InvalidTempo(input.to_string())),
    }
}
