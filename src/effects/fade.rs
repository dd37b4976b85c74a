use crate::device::DeviceDispatcher;
use crate::effects::{ColorFollower, ColorSource, EffectKind, RhythmEffect};
use crate::intervaltimer::ScheduleConfig;
use crate::lightstate::SharedState;

/// Toggles power every two beats, moving to the next color whenever the
/// light comes back on.
pub struct Fade {
    colors: ColorFollower,
    power: bool,
    brightness: u8,
}

impl Fade {
    pub fn new(source: ColorSource, state: &SharedState) -> Fade {
        Fade {
            colors: ColorFollower::new(source, state),
            power: true,
            brightness: 100,
        }
    }
}

impl RhythmEffect for Fade {
    fn kind(&self) -> EffectKind {
        EffectKind::Fade
    }

    fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig::beats(2)
    }

    fn begin(&mut self, device: &DeviceDispatcher) {
        device.set_color(self.colors.current(), self.brightness);
        device.set_power(self.power);
    }

    fn refresh(&mut self, state: &SharedState) {
        self.colors.refresh(state);
    }

    fn fire(&mut self, device: &DeviceDispatcher) {
        self.power = !self.power;
        device.set_power(self.power);

        if self.power && self.colors.len() > 1 {
            let color = self.colors.advance();
            device.set_color(color, self.brightness);
        }
    }
}
