use log::info;

use crate::error::{DeviceError, IoLoopError};
use crate::message::SensorMessage;
use crate::queue::MessagePoster;
use crate::shutdown::StopSignal;
use crate::worker::Worker;

/// A blocking stream of decoded device messages.
pub trait MessageSource {
    /// Waits for the next message.
    ///
    /// `Ok(None)` means the read timed out without a complete message; the
    /// caller may check for shutdown and call again.
    fn next_message(&mut self) -> Result<Option<SensorMessage>, DeviceError>;
}

impl<S: MessageSource + ?Sized> MessageSource for Box<S> {
    fn next_message(&mut self) -> Result<Option<SensorMessage>, DeviceError> {
        (**self).next_message()
    }
}

/// Reads messages from one device and posts them to the manager untouched.
///
/// The device is opened when the loop starts and closed (dropped) when it
/// ends, whatever the reason. A read already in progress is not interrupted
/// by a stop request, so shutdown waits for at most one read timeout.
pub struct DeviceIoLoop<F> {
    device_name: String,
    open: F,
    poster: MessagePoster,
}

impl<F, S> DeviceIoLoop<F>
where
    F: FnOnce() -> Result<S, DeviceError> + Send + 'static,
    S: MessageSource,
{
    pub fn new(device_name: impl Into<String>, open: F, poster: MessagePoster) -> Self {
        Self {
            device_name: device_name.into(),
            open,
            poster,
        }
    }
}

impl<F, S> Worker for DeviceIoLoop<F>
where
    F: FnOnce() -> Result<S, DeviceError> + Send + 'static,
    S: MessageSource,
{
    type Error = IoLoopError;

    fn name(&self) -> &str {
        "device-io"
    }

    fn run(self, stop: &StopSignal) -> Result<(), IoLoopError> {
        let DeviceIoLoop {
            device_name,
            open,
            poster,
        } = self;

        info!("Opening device {}", device_name);
        let mut source = open()?;

        info!("Starting reader loop for {}", device_name);
        while !stop.is_requested() {
            match source.next_message() {
                Ok(Some(message)) => poster.post(&device_name, message)?,
                Ok(None) => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!("Reader loop for {} ended", device_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{message_queue, Received};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct ScriptedSource {
        script: VecDeque<Result<Option<SensorMessage>, DeviceError>>,
        closed: Arc<AtomicBool>,
        stop_when_empty: Option<StopSignal>,
    }

    impl MessageSource for ScriptedSource {
        fn next_message(&mut self) -> Result<Option<SensorMessage>, DeviceError> {
            match self.script.pop_front() {
                Some(step) => step,
                None => {
                    if let Some(stop) = &self.stop_when_empty {
                        stop.request();
                    }
                    Ok(None)
                }
            }
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn drain(inbox: &crate::queue::MessageInbox) -> Vec<SensorMessage> {
        let mut out = Vec::new();
        while let Received::Item(item) = inbox.poll(Duration::from_millis(1)) {
            assert_eq!(item.device_name, "kegboard");
            out.push(item.message);
        }
        out
    }

    #[test]
    fn forwards_messages_in_order_and_closes_on_stop() {
        let (poster, inbox) = message_queue();
        let stop = StopSignal::new();
        let closed = Arc::new(AtomicBool::new(false));
        let hello = SensorMessage::Hello {
            firmware_version: 17,
        };
        let source = ScriptedSource {
            script: VecDeque::from(vec![
                Ok(Some(SensorMessage::meter("flow0", 1))),
                Ok(None),
                Ok(Some(hello.clone())),
                Ok(Some(SensorMessage::thermo("thermo-0", 3.5))),
            ]),
            closed: closed.clone(),
            stop_when_empty: Some(stop.clone()),
        };

        let io_loop = DeviceIoLoop::new("kegboard", move || Ok(source), poster);
        io_loop.run(&stop).unwrap();

        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(
            drain(&inbox),
            vec![
                SensorMessage::meter("flow0", 1),
                hello,
                SensorMessage::thermo("thermo-0", 3.5),
            ]
        );
    }

    #[test]
    fn read_failure_is_surfaced_and_device_closed() {
        let (poster, inbox) = message_queue();
        let closed = Arc::new(AtomicBool::new(false));
        let source = ScriptedSource {
            script: VecDeque::from(vec![
                Ok(Some(SensorMessage::meter("flow0", 5))),
                Err(DeviceError::Disconnected),
                Ok(Some(SensorMessage::meter("flow0", 6))),
            ]),
            closed: closed.clone(),
            stop_when_empty: None,
        };

        let io_loop = DeviceIoLoop::new("kegboard", move || Ok(source), poster);
        let err = io_loop.run(&StopSignal::new()).unwrap_err();

        let IoLoopError::Device(cause) = err else {
            panic!("expected a device error");
        };
        assert!(matches!(cause, DeviceError::Disconnected));
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(drain(&inbox), vec![SensorMessage::meter("flow0", 5)]);
    }

    #[test]
    fn open_failure_is_surfaced() {
        let (poster, _inbox) = message_queue();
        let io_loop = DeviceIoLoop::new(
            "kegboard",
            || Err::<ScriptedSource, _>(DeviceError::Disconnected),
            poster,
        );
        assert!(io_loop.run(&StopSignal::new()).is_err());
    }

    #[test]
    fn stops_before_reading_when_already_requested() {
        let (poster, inbox) = message_queue();
        let stop = StopSignal::new();
        stop.request();
        let source = ScriptedSource {
            script: VecDeque::from(vec![Ok(Some(SensorMessage::meter("flow0", 1)))]),
            closed: Arc::new(AtomicBool::new(false)),
            stop_when_empty: None,
        };

        DeviceIoLoop::new("kegboard", move || Ok(source), poster)
            .run(&stop)
            .unwrap();
        let polled = inbox.poll(Duration::from_millis(1));
        assert!(matches!(polled, Received::Empty));
    }

    #[test]
    fn exits_when_manager_is_gone() {
        let (poster, inbox) = message_queue();
        drop(inbox);
        let source = ScriptedSource {
            script: VecDeque::from(vec![Ok(Some(SensorMessage::meter("flow0", 1)))]),
            closed: Arc::new(AtomicBool::new(false)),
            stop_when_empty: None,
        };

        let err = DeviceIoLoop::new("kegboard", move || Ok(source), poster)
            .run(&StopSignal::new())
            .unwrap_err();
        assert!(matches!(err, IoLoopError::QueueClosed(_)));
    }
}
