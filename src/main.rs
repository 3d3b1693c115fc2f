use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use nix::sys::signal::{SigSet, Signal};

use kegboard_bridge::config::{Cli, Config};
use kegboard_bridge::decoder::LineReader;
use kegboard_bridge::serial_utils::open_serial_port;
use kegboard_bridge::{
    message_queue, worker, DeviceIoLoop, DuplicateSuppressingCache, Manager, StopSignal,
    TcpKegnetClient,
};

const SUPERVISE_INTERVAL: Duration = Duration::from_millis(250);

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    let window = config.suppression_window_seconds;
    info!(
        "Bridging {} ({}) to {}, suppression window {}s",
        config.device_name, config.serial.path, config.kegnet.addr, window
    );

    // Must run before any other thread is spawned so they inherit the mask.
    let stop = StopSignal::new();
    watch_signals(&stop)?;

    let (poster, inbox) = message_queue();
    let client = TcpKegnetClient::new(
        config.kegnet.addr.clone(),
        config.kegnet.connect_timeout(),
        config.kegnet.send_timeout(),
    );
    let manager = Manager::new(
        client,
        inbox,
        DuplicateSuppressingCache::new(config.suppression_window()),
        config.poll_interval(),
    );
    let serial = config.serial.clone();
    let device_io = DeviceIoLoop::new(
        config.device_name.clone(),
        move || open_serial_port(&serial).map(LineReader::new),
        poster,
    );

    let manager = worker::start(manager, &stop).context("starting manager thread")?;
    let device_io = worker::start(device_io, &stop).context("starting device thread")?;

    while !stop.wait_timeout(SUPERVISE_INTERVAL) {
        if device_io.is_finished() || manager.is_finished() {
            stop.request();
        }
    }

    info!("Shutting down.");
    let device_result = device_io.join();
    let manager_result = manager.join();
    device_result.and(manager_result)
}

fn watch_signals(stop: &StopSignal) -> anyhow::Result<()> {
    let mut signals = SigSet::empty();
    signals.add(Signal::SIGINT);
    signals.add(Signal::SIGTERM);
    signals.thread_block().context("blocking signals")?;

    let stop = stop.clone();
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || match signals.wait() {
            Ok(signal) => {
                info!("Received {:?}, stopping.", signal);
                stop.request();
            }
            Err(e) => warn!("Waiting for signals failed: {}", e),
        })
        .context("starting signal thread")?;
    Ok(())
}
