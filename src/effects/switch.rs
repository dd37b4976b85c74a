use crate::device::DeviceDispatcher;
use crate::effects::{ColorFollower, ColorSource, EffectKind, RhythmEffect};
use crate::intervaltimer::ScheduleConfig;
use crate::lightstate::SharedState;

/// Hard color change every two beats, power stays on.
pub struct Switch {
    colors: ColorFollower,
    brightness: u8,
}

impl Switch {
    pub fn new(source: ColorSource, state: &SharedState) -> Switch {
        Switch {
            colors: ColorFollower::new(source, state),
            brightness: 100,
        }
    }
}

impl RhythmEffect for Switch {
    fn kind(&self) -> EffectKind {
        EffectKind::Switch
    }

    fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig::beats(2)
    }

    fn begin(&mut self, device: &DeviceDispatcher) {
        device.set_color(self.colors.current(), self.brightness);
        device.set_power(true);
    }

    fn refresh(&mut self, state: &SharedState) {
        self.colors.refresh(state);
    }

    fn fire(&mut self, device: &DeviceDispatcher) {
        let color = if self.colors.len() > 1 {
            self.colors.advance()
        } else {
            self.colors.current()
        };
        device.set_color(color, self.brightness);
    }
}
