pub(crate) mod beat;
pub(crate) mod fade;
pub(crate) mod strobe;
pub(crate) mod switch;

use std::fmt;

use tokio::sync::watch;

use crate::colors::{Color, ColorSequence};
use crate::device::DeviceDispatcher;
use crate::intervaltimer::{Cycle, IntervalTimer, ScheduleConfig};
use crate::lightstate::SharedState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    Fade,
    Switch,
    Beat,
    Strobe,
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectKind::Fade => "fade",
            EffectKind::Switch => "switch",
            EffectKind::Beat => "beat",
            EffectKind::Strobe => "strobe",
        };
        f.write_str(name)
    }
}

/// A tempo-locked pattern. `fire` runs once per scheduled cycle and must only
/// queue device commands, never wait on them.
pub trait RhythmEffect: Send + 'static {
    fn kind(&self) -> EffectKind;
    fn schedule(&self) -> ScheduleConfig;

    /// Initial device setup before the first cycle.
    fn begin(&mut self, _device: &DeviceDispatcher) {}

    /// Called at the top of every iteration to pick up shared state changes.
    fn refresh(&mut self, _state: &SharedState) {}

    fn fire(&mut self, device: &DeviceDispatcher);
}

/// Drives an effect until the stop signal flips or its sender is dropped.
pub async fn run_effect<E: RhythmEffect>(
    mut effect: E,
    state: SharedState,
    device: DeviceDispatcher,
    mut stop: watch::Receiver<bool>,
) {
    if *stop.borrow() {
        return;
    }

    let mut timer = IntervalTimer::new(effect.schedule(), state.clone());
    log::info!(
        "Starting {} loop: {} BPM, interval: {:.1}ms",
        effect.kind(),
        state.tempo(),
        timer.interval().as_secs_f64() * 1000.0
    );

    effect.begin(&device);

    loop {
        if *stop.borrow() {
            break;
        }

        timer.check_tempo_changed();
        effect.refresh(&state);

        let cycle = tokio::select! {
            biased;
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
                continue;
            }
            cycle = timer.wait_for_next_cycle() => cycle,
        };

        match cycle {
            Cycle::Fire => effect.fire(&device),
            Cycle::Skip => log::debug!("{} loop skipped a cycle", effect.kind()),
        }
    }

    log::debug!("{} loop stopped", effect.kind());
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorSource {
    Shared,
    Fixed(Color),
}

/// Local copy of the color sequence a loop walks through. Follows replacements
/// of the shared sequence unless pinned to a single color.
pub struct ColorFollower {
    source: ColorSource,
    sequence: ColorSequence,
    version: u64,
}

impl ColorFollower {
    pub fn new(source: ColorSource, state: &SharedState) -> ColorFollower {
        match source {
            ColorSource::Fixed(color) => ColorFollower {
                source,
                sequence: ColorSequence::single(color),
                version: 0,
            },
            ColorSource::Shared => {
                let snapshot = state.colors();
                ColorFollower {
                    source,
                    sequence: ColorSequence::or_default(snapshot.colors.to_vec()),
                    version: snapshot.version,
                }
            }
        }
    }

    /// Returns true if a replaced shared sequence was picked up.
    pub fn refresh(&mut self, state: &SharedState) -> bool {
        if self.source != ColorSource::Shared || state.colors_version() == self.version {
            return false;
        }

        let snapshot = state.colors();
        self.sequence = ColorSequence::or_default(snapshot.colors.to_vec());
        self.version = snapshot.version;
        log::info!("Colors updated: {} colors", self.sequence.len());
        true
    }

    pub fn current(&self) -> Color {
        self.sequence.current()
    }

    pub fn advance(&mut self) -> Color {
        self.sequence.advance()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }
}
