use std::sync::Arc;

use tokio::time::Instant;

use crate::colors::{self, Color};
use crate::device::{DeviceClient, DeviceDispatcher, BUILTIN_EFFECTS};
use crate::effectmanager::{EffectManager, ResumeKind, StrobeToggle};
use crate::effects::EffectKind;
use crate::error::Result;
use crate::latency::LatencyTracker;
use crate::lightstate::{self, SharedState};
use crate::taptempo::{TapOutcome, TapTempo};

pub const HELP: &str = "\
Commands:
  e - cycle effects
  p - toggle power
  #RRGGBB or color_name - set color (e.g., 'red', 'cyan', '#ff0000')
  f - a single white flash
  s [color] - toggle strobe on or off
  fade [color] - fade effect every 2 beats
  switch [color] - instant color switch every 2 beats
  colors [color1] [color2] ... - set color list (supports names or hex)
  palette - show available color names
  beat - beat loop (strobe flash)
  tap - tempo tapper
  tempo [bpm] - set tempo manually
  ] - double the bpm
  [ - half the bpm
  stop - stop beat/fade/switch/strobe loop
  stats - show latency stats
  devices - list devices
  state - show device state
  help - show this help
  q - quit";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Empty,
    Quit,
    CycleEffect,
    TogglePower,
    SetColor(String),
    Flash,
    Strobe(Option<String>),
    Fade(Option<String>),
    Switch(Option<String>),
    Colors(Vec<String>),
    Palette,
    Beat,
    Tap,
    Tempo(Option<String>),
    DoubleTempo,
    HalveTempo,
    Stop,
    Stats,
    Devices,
    State,
    Help,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let mut parts = line.split_whitespace();
        let head = match parts.next() {
            Some(head) => head,
            None => return Command::Empty,
        };
        let arg = parts.next().map(str::to_string);

        match head {
            "q" => Command::Quit,
            "e" => Command::CycleEffect,
            "p" => Command::TogglePower,
            "f" => Command::Flash,
            "s" => Command::Strobe(arg),
            "fade" => Command::Fade(arg),
            "switch" => Command::Switch(arg),
            "colors" => {
                let mut names: Vec<String> = arg.into_iter().collect();
                names.extend(parts.map(str::to_string));
                Command::Colors(names)
            }
            "palette" => Command::Palette,
            "beat" => Command::Beat,
            "tap" => Command::Tap,
            "tempo" => Command::Tempo(arg),
            "]" => Command::DoubleTempo,
            "[" => Command::HalveTempo,
            "stop" => Command::Stop,
            "stats" => Command::Stats,
            "devices" => Command::Devices,
            "state" => Command::State,
            "help" => Command::Help,
            color if colors::is_color_literal(color) => Command::SetColor(color.to_string()),
            _ => Command::Unknown(line.trim().to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Maps console input onto the effect manager, shared state and device.
pub struct Console {
    state: SharedState,
    device: DeviceDispatcher,
    client: Option<Arc<DeviceClient>>,
    manager: EffectManager,
    latency: LatencyTracker,
    tapper: Option<TapTempo>,
    effect_index: usize,
    power: bool,
}

impl Console {
    pub fn new(
        state: SharedState,
        device: DeviceDispatcher,
        client: Option<Arc<DeviceClient>>,
        manager: EffectManager,
        latency: LatencyTracker,
    ) -> Console {
        Console {
            state,
            device,
            client,
            manager,
            latency,
            tapper: None,
            effect_index: 0,
            power: false,
        }
    }

    pub fn greeting(&self) -> String {
        format!(
            "{HELP}\n\nCurrent tempo: {} BPM\nCurrent colors: {}\n",
            self.state.tempo(),
            self.color_list()
        )
    }

    pub fn is_tapping(&self) -> bool {
        self.tapper.is_some()
    }

    #[cfg(test)]
    pub fn manager(&self) -> &EffectManager {
        &self.manager
    }

    /// Handles one line of input. While tap mode is active, lines are taps.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        if self.tapper.is_some() {
            self.handle_tap(line, Instant::now());
            return Flow::Continue;
        }

        let command = Command::parse(line);
        match self.execute(command).await {
            Ok(flow) => flow,
            Err(err) => {
                println!("{err}");
                Flow::Continue
            }
        }
    }

    fn handle_tap(&mut self, line: &str, at: Instant) {
        let tapper = match self.tapper.as_mut() {
            Some(tapper) => tapper,
            None => return,
        };

        let input = line.trim();
        if !(input.is_empty() || input.eq_ignore_ascii_case("t")) {
            self.tapper = None;
            println!("Exited tempo tapper. Final tempo: {} BPM", self.state.tempo());
            return;
        }

        match tapper.tap_and_publish(at, &self.state) {
            TapOutcome::NeedMoreTaps { taps } => println!("Tap {taps}/2... (tap more)"),
            TapOutcome::Tempo { bpm, taps } => println!("- Tempo: {bpm} BPM (from {taps} taps)"),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Empty => {}
            Command::Quit => return Ok(Flow::Quit),
            Command::CycleEffect => {
                let effect = BUILTIN_EFFECTS[self.effect_index % BUILTIN_EFFECTS.len()];
                self.effect_index += 1;
                self.device.set_effect(effect, 100);
                println!("Effect: {effect}");
            }
            Command::TogglePower => {
                self.power = !self.power;
                self.device.set_power(self.power);
                println!("Power: {}", if self.power { "ON" } else { "OFF" });
            }
            Command::SetColor(input) => {
                let color = colors::resolve_color(&input)?;
                self.device.set_color(color, 100);
                println!("Color set to: {}", colors::to_hex(color));
            }
            Command::Flash => {
                self.device.flash();
                println!("Flash");
            }
            Command::Strobe(color) => match self.manager.toggle_strobe(color.as_deref()) {
                StrobeToggle::On { .. } => println!("Strobe ON"),
                StrobeToggle::Off { resumed } => {
                    println!("Strobe OFF");
                    if resumed != ResumeKind::None {
                        println!("Resumed {resumed:?}");
                    }
                }
            },
            Command::Fade(color) => {
                let color = Self::optional_color(color.as_deref())?;
                report_stopped(self.manager.start_fade(color));
            }
            Command::Switch(color) => {
                let color = Self::optional_color(color.as_deref())?;
                report_stopped(self.manager.start_switch(color));
            }
            Command::Colors(inputs) => {
                if inputs.is_empty() {
                    println!("Current colors: {}", self.color_list());
                } else {
                    self.state.replace_colors(colors::parse_color_list(&inputs)?)?;
                    println!("Colors set to: {}", self.color_list());
                }
            }
            Command::Palette => {
                println!("Available color names:");
                for (name, color) in colors::palette() {
                    println!("  {name:12} - {}", colors::to_hex(color));
                }
            }
            Command::Beat => {
                report_stopped(self.manager.start_beat());
            }
            Command::Tap => {
                self.tapper = Some(TapTempo::new());
                println!("--- Tap Tempo Mode ---");
                println!("Press Enter (or 't' + Enter) on every beat");
                println!("Enter anything else to exit tap mode");
            }
            Command::Tempo(None) => println!("Current tempo: {} BPM", self.state.tempo()),
            Command::Tempo(Some(input)) => {
                let bpm = self.state.set_tempo(lightstate::parse_tempo(&input)?)?;
                println!("Tempo set to {bpm} BPM");
            }
            Command::DoubleTempo => println!("New tempo: {}", self.state.double_tempo()),
            Command::HalveTempo => println!("New tempo: {}", self.state.halve_tempo()),
            Command::Stop => {
                report_stopped(self.manager.stop_all());
                self.device.set_power(false);
            }
            Command::Stats => match self.latency.stats() {
                Some(stats) => println!("{stats}"),
                None => println!("No latency data yet ({} failed)", self.latency.failures()),
            },
            Command::Devices => match &self.client {
                Some(client) => println!("{}", client.devices().await?),
                None => println!("No device connection"),
            },
            Command::State => match &self.client {
                Some(client) => println!("{}", client.device_state().await?),
                None => println!("No device connection"),
            },
            Command::Help => println!("{HELP}"),
            Command::Unknown(input) => println!("Unknown command: {input}"),
        }

        Ok(Flow::Continue)
    }

    pub fn shutdown(&mut self) {
        self.manager.stop_all();
    }

    fn optional_color(input: Option<&str>) -> Result<Option<Color>> {
        input.map(colors::resolve_color).transpose()
    }

    fn color_list(&self) -> String {
        let colors: Vec<String> = self
            .state
            .colors()
            .colors
            .iter()
            .map(|c| colors::to_hex(*c))
            .collect();
        colors.join(" ")
    }
}

fn report_stopped(stopped: Vec<EffectKind>) {
    if !stopped.is_empty() {
        let names: Vec<String> = stopped.iter().map(|kind| kind.to_string()).collect();
        println!("Stopped: {}", names.join(", "));
    }
}
