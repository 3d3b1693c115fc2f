use std::convert::Infallible;
use std::time::Duration;

use log::{debug, info, warn};

use crate::cache::{CacheKey, DuplicateSuppressingCache, ReadingValue};
use crate::client::KegnetClient;
use crate::error::SendError;
use crate::message::SensorMessage;
use crate::queue::{MessageInbox, Received};
use crate::shutdown::StopSignal;
use crate::worker::Worker;

/// What happened to a single device message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Sent,
    Suppressed,
    /// Not a reading the kegnet client knows about.
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub forwarded: u64,
    pub suppressed: u64,
    pub ignored: u64,
    pub failed: u64,
}

/// Sole consumer of device messages and owner of the suppression cache.
pub struct Manager<C> {
    client: C,
    inbox: MessageInbox,
    cache: DuplicateSuppressingCache,
    poll_interval: Duration,
    stats: ManagerStats,
}

impl<C: KegnetClient> Manager<C> {
    pub fn new(
        client: C,
        inbox: MessageInbox,
        cache: DuplicateSuppressingCache,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            inbox,
            cache,
            poll_interval,
            stats: ManagerStats::default(),
        }
    }

    pub fn stats(&self) -> ManagerStats {
        self.stats
    }

    /// Applies duplicate suppression to `message` and forwards it if needed.
    ///
    /// Messages other than meter and temperature readings are ignored so that
    /// newer decoders can report more than this manager understands.
    pub fn handle_message(
        &mut self,
        device_name: &str,
        message: SensorMessage,
    ) -> Result<Dispatch, SendError> {
        let result = match message {
            SensorMessage::MeterReading { meter_name, value } => {
                let key = CacheKey::meter(meter_name);
                let reading = ReadingValue::Count(value);
                if self.cache.should_suppress(&key, reading) {
                    Ok(Dispatch::Suppressed)
                } else {
                    self.client
                        .send_meter_update(&key.identifier, value)
                        .map(|()| Dispatch::Sent)
                }
            }
            SensorMessage::ThermoReading { sensor_name, value } => {
                let key = CacheKey::thermo(sensor_name);
                let reading = ReadingValue::Celsius(value);
                if self.cache.should_suppress(&key, reading) {
                    Ok(Dispatch::Suppressed)
                } else {
                    self.client
                        .send_thermo_update(&key.identifier, value)
                        .map(|()| Dispatch::Sent)
                }
            }
            other => {
                debug!("Ignoring message from {}: {:?}", device_name, other);
                Ok(Dispatch::Ignored)
            }
        };

        match result {
            Ok(Dispatch::Sent) => self.stats.forwarded += 1,
            Ok(Dispatch::Suppressed) => self.stats.suppressed += 1,
            Ok(Dispatch::Ignored) => self.stats.ignored += 1,
            Err(_) => self.stats.failed += 1,
        }
        result
    }

    /// Runs until `stop` is requested or every producer has gone away.
    ///
    /// A failed send is logged and the reading dropped; it never ends the loop.
    pub fn run_loop(&mut self, stop: &StopSignal) {
        info!("Starting main loop.");
        while !stop.is_requested() {
            let item = match self.inbox.poll(self.poll_interval) {
                Received::Item(item) => item,
                Received::Empty => continue,
                Received::Closed => {
                    info!("Message queue closed.");
                    break;
                }
            };

            match self.handle_message(&item.device_name, item.message) {
                Ok(Dispatch::Suppressed) => {
                    debug!("Suppressed duplicate reading from {}", item.device_name);
                }
                Ok(_) => {}
                Err(e) => warn!("Got error during send: {:#}", anyhow::Error::from(e)),
            }
        }

        let ManagerStats {
            forwarded,
            suppressed,
            ignored,
            failed,
        } = self.stats;
        info!(
            "Exiting main loop (forwarded={}, suppressed={}, ignored={}, failed={}).",
            forwarded, suppressed, ignored, failed
        );
    }
}

impl<C: KegnetClient + Send + 'static> Worker for Manager<C> {
    type Error = Infallible;

    fn name(&self) -> &str {
        "kegboard-manager"
    }

    fn run(mut self, stop: &StopSignal) -> Result<(), Infallible> {
        self.run_loop(stop);
        Ok(())
    }
}
