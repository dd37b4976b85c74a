pub(crate) mod colors;
pub(crate) mod config;
pub(crate) mod console;
pub(crate) mod device;
pub(crate) mod effectmanager;
pub(crate) mod effects;
pub(crate) mod error;
pub(crate) mod intervaltimer;
pub(crate) mod latency;
pub(crate) mod lightstate;
pub(crate) mod taptempo;

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::console::{Console, Flow};
use crate::device::{DeviceClient, DeviceDispatcher};
use crate::effectmanager::EffectManager;
use crate::error::Result;
use crate::latency::LatencyTracker;
use crate::lightstate::SharedState;

#[derive(Parser)]
struct Cli {
    /// Config file (TOML, JSON, YAML or XML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<std::path::PathBuf>,

    /// Base URL of the light's HTTP API
    #[arg(short, long, value_name = "URL")]
    base_url: Option<String>,

    /// Device to control
    #[arg(short, long, value_name = "ID")]
    device: Option<String>,

    /// Starting tempo in BPM
    #[arg(short, long, value_name = "BPM")]
    tempo: Option<u32>,
}

fn load_config(args: &Cli) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(device) = &args.device {
        config.device_id = device.clone();
    }
    if let Some(tempo) = args.tempo {
        config.tempo = tempo;
    }
    Ok(config)
}

/// Blocking stdin reads live on their own thread so they never hold up the
/// runtime, neither while running nor at shutdown.
fn spawn_console_reader() -> mpsc::UnboundedReceiver<String> {
    let (sender, receiver) = mpsc::unbounded_channel();

    let res = thread::Builder::new()
        .name("Console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        log::error!("Cannot read from console: {err}");
                        break;
                    }
                }
            }
        });
    if let Err(error) = res {
        log::error!("Failed to create console thread: {error}");
    }

    receiver
}

fn prompt(tapping: bool) {
    if !tapping {
        print!("\n$: ");
        let _ = std::io::stdout().flush();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Cli::parse();
    let config = load_config(&args)?;

    let state = SharedState::new(config.tempo()?, config.colors());
    let latency = LatencyTracker::new();
    let client = Arc::new(DeviceClient::new(
        &config.base_url,
        &config.device_id,
        config.request_timeout(),
        latency.clone(),
    )?);

    let (device, commands) = DeviceDispatcher::channel();
    tokio::spawn(device::run_device_worker(Arc::clone(&client), commands));

    let (quit, mut quit_requested) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = quit.send(true);
    })?;

    let manager = EffectManager::new(state.clone(), device.clone(), config.strobe_interval());
    let mut console = Console::new(state, device, Some(client), manager, latency);
    let mut lines = spawn_console_reader();

    println!("{}", console.greeting());
    loop {
        prompt(console.is_tapping());

        let line = tokio::select! {
            _ = quit_requested.changed() => break,
            line = lines.recv() => line,
        };

        let line = match line {
            Some(line) => line,
            None => break,
        };

        if console.handle_line(&line).await == Flow::Quit {
            break;
        }
    }

    console.shutdown();
    Ok(())
}
