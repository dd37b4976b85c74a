use std::time::Duration;

use crate::device::DeviceDispatcher;
use crate::effects::{EffectKind, RhythmEffect};
use crate::intervaltimer::ScheduleConfig;

pub const DEFAULT_STROBE_INTERVAL: Duration = Duration::from_millis(80);

/// Fixed-rate flashing, deliberately not tied to the tempo.
pub struct Strobe {
    effect: &'static str,
    interval: Duration,
}

impl Strobe {
    pub fn new(effect: &'static str, interval: Duration) -> Strobe {
        Strobe { effect, interval }
    }
}

impl RhythmEffect for Strobe {
    fn kind(&self) -> EffectKind {
        EffectKind::Strobe
    }

    fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig::fixed(self.interval)
    }

    fn fire(&mut self, device: &DeviceDispatcher) {
        device.set_effect(self.effect, 50);
    }
}
