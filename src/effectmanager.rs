use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::colors::Color;
use crate::device::{self, DeviceDispatcher};
use crate::effects::beat::Beat;
use crate::effects::fade::Fade;
use crate::effects::strobe::Strobe;
use crate::effects::switch::Switch;
use crate::effects::{run_effect, ColorSource, EffectKind, RhythmEffect};
use crate::lightstate::SharedState;

/// A running effect loop. Dropping the handle also stops the loop, since the
/// loop exits once its stop sender is gone.
pub struct EffectHandle {
    kind: EffectKind,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl EffectHandle {
    fn spawn<E: RhythmEffect>(
        effect: E,
        state: &SharedState,
        device: &DeviceDispatcher,
    ) -> EffectHandle {
        let (stop, stop_receiver) = watch::channel(false);
        let kind = effect.kind();
        let task = tokio::spawn(run_effect(effect, state.clone(), device.clone(), stop_receiver));

        EffectHandle { kind, stop, task }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Asks the loop to stop at its next wait. Never aborts a running call.
    pub fn cancel(self) -> JoinHandle<()> {
        let _ = self.stop.send(true);
        self.task
    }
}

/// Which color loop to bring back once the strobe is switched off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResumeKind {
    None,
    Fade,
    Switch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrobeToggle {
    On { interrupted: ResumeKind },
    Off { resumed: ResumeKind },
}

pub struct EffectManager {
    state: SharedState,
    device: DeviceDispatcher,
    strobe_interval: Duration,
    active: Option<EffectHandle>,
    resume: ResumeKind,
}

impl EffectManager {
    pub fn new(
        state: SharedState,
        device: DeviceDispatcher,
        strobe_interval: Duration,
    ) -> EffectManager {
        EffectManager {
            state,
            device,
            strobe_interval,
            active: None,
            resume: ResumeKind::None,
        }
    }

    pub fn active_kind(&self) -> Option<EffectKind> {
        self.active.as_ref().map(EffectHandle::kind)
    }

    /// Cancels the running loop, if any, and reports what was stopped.
    pub fn stop_all(&mut self) -> Vec<EffectKind> {
        let mut stopped = Vec::new();
        if let Some(handle) = self.active.take() {
            stopped.push(handle.kind());
            // the loop winds down on its own; nothing to wait for here
            drop(handle.cancel());
        }

        if !stopped.is_empty() {
            log::debug!("Stopped {stopped:?}");
        }
        stopped
    }

    pub fn start_fade(&mut self, color: Option<Color>) -> Vec<EffectKind> {
        let fade = Fade::new(Self::color_source(color), &self.state);
        self.replace(fade)
    }

    pub fn start_switch(&mut self, color: Option<Color>) -> Vec<EffectKind> {
        let switch = Switch::new(Self::color_source(color), &self.state);
        self.replace(switch)
    }

    pub fn start_beat(&mut self) -> Vec<EffectKind> {
        self.replace(Beat::new())
    }

    /// Strobe on remembers the color loop it interrupts; strobe off brings
    /// that loop back with default settings, or leaves everything idle.
    pub fn toggle_strobe(&mut self, color_name: Option<&str>) -> StrobeToggle {
        if self.active_kind() == Some(EffectKind::Strobe) {
            self.stop_all();
            let resumed = std::mem::replace(&mut self.resume, ResumeKind::None);
            match resumed {
                ResumeKind::Fade => {
                    self.start_fade(None);
                }
                ResumeKind::Switch => {
                    self.start_switch(None);
                }
                ResumeKind::None => {}
            }
            return StrobeToggle::Off { resumed };
        }

        self.resume = match self.active_kind() {
            Some(EffectKind::Fade) => ResumeKind::Fade,
            Some(EffectKind::Switch) => ResumeKind::Switch,
            _ => ResumeKind::None,
        };

        let strobe = Strobe::new(device::strobe_effect_for(color_name), self.strobe_interval);
        self.replace(strobe);
        StrobeToggle::On {
            interrupted: self.resume,
        }
    }

    fn replace<E: RhythmEffect>(&mut self, effect: E) -> Vec<EffectKind> {
        let stopped = self.stop_all();
        self.active = Some(EffectHandle::spawn(effect, &self.state, &self.device));
        stopped
    }

    fn color_source(color: Option<Color>) -> ColorSource {
        match color {
            Some(color) => ColorSource::Fixed(color),
            None => ColorSource::Shared,
        }
    }
}
