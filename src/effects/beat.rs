use crate::device::{DeviceDispatcher, FLASH_EFFECT};
use crate::effects::{EffectKind, RhythmEffect};
use crate::intervaltimer::ScheduleConfig;

/// White flash on every beat.
pub struct Beat {
    speed: u8,
}

impl Beat {
    pub fn new() -> Beat {
        Beat { speed: 100 }
    }
}

impl RhythmEffect for Beat {
    fn kind(&self) -> EffectKind {
        EffectKind::Beat
    }

    fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig::beats(1)
    }

    fn begin(&mut self, device: &DeviceDispatcher) {
        device.set_power(true);
    }

    fn fire(&mut self, device: &DeviceDispatcher) {
        device.set_effect(FLASH_EFFECT, self.speed);
    }
}
