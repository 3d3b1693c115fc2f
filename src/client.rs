use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info};

use crate::error::SendError;

/// Upstream sink for readings that survived duplicate suppression.
pub trait KegnetClient {
    fn send_meter_update(&mut self, meter_name: &str, value: u64) -> Result<(), SendError>;

    fn send_thermo_update(&mut self, sensor_name: &str, value: f64) -> Result<(), SendError>;
}

impl<C: KegnetClient + ?Sized> KegnetClient for Box<C> {
    fn send_meter_update(&mut self, meter_name: &str, value: u64) -> Result<(), SendError> {
        (**self).send_meter_update(meter_name, value)
    }

    fn send_thermo_update(&mut self, sensor_name: &str, value: f64) -> Result<(), SendError> {
        (**self).send_thermo_update(sensor_name, value)
    }
}

/// Line-oriented TCP client.
///
/// Connects on first use and again after any failed write. Every write is
/// bounded by `send_timeout`.
#[derive(Debug)]
pub struct TcpKegnetClient {
    addr: String,
    connect_timeout: Duration,
    send_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpKegnetClient {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration, send_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            send_timeout,
            stream: None,
        }
    }

    fn connect(&self) -> Result<TcpStream, SendError> {
        let connect_err = |source| SendError::Connect {
            addr: self.addr.clone(),
            source,
        };
        let sock_addr = self
            .addr
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| SendError::Resolve(self.addr.clone()))?;

        let timeout = self.connect_timeout;
        let stream = TcpStream::connect_timeout(&sock_addr, timeout).map_err(connect_err)?;
        stream.set_write_timeout(Some(self.send_timeout))?;
        stream.set_nodelay(true)?;
        info!("Connected to kegnet server at {}", self.addr);
        Ok(stream)
    }

    fn connection(&mut self) -> Result<&mut TcpStream, SendError> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.connect()?,
        };
        Ok(self.stream.insert(stream))
    }

    fn send_line(&mut self, line: String) -> Result<(), SendError> {
        let stream = self.connection()?;
        if let Err(e) = stream.write_all(line.as_bytes()) {
            debug!("Dropping connection to {}", self.addr);
            self.stream = None;
            return Err(SendError::Io(e));
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), SendError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(SendError::InvalidName(name.to_owned()));
    }
    Ok(())
}

impl KegnetClient for TcpKegnetClient {
    fn send_meter_update(&mut self, meter_name: &str, value: u64) -> Result<(), SendError> {
        check_name(meter_name)?;
        self.send_line(format!("meter_update {} {}\n", meter_name, value))
    }

    fn send_thermo_update(&mut self, sensor_name: &str, value: f64) -> Result<(), SendError> {
        check_name(sensor_name)?;
        self.send_line(format!("thermo_update {} {}\n", sensor_name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    fn client_for(listener: &TcpListener) -> TcpKegnetClient {
        let addr = listener.local_addr().unwrap().to_string();
        TcpKegnetClient::new(addr, Duration::from_secs(1), Duration::from_secs(1))
    }

    #[test]
    fn writes_one_line_per_update() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            BufReader::new(stream)
                .lines()
                .take(2)
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        });

        client.send_meter_update("kegboard.flow0", 100).unwrap();
        client.send_thermo_update("t0", 4.25).unwrap();

        assert_eq!(
            server.join().unwrap(),
            vec!["meter_update kegboard.flow0 100", "thermo_update t0 4.25"]
        );
    }

    #[test]
    fn connect_failure_is_reported_on_every_send() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);
        drop(listener);

        for value in 1..=2 {
            let err = client.send_meter_update("flow0", value).unwrap_err();
            assert!(matches!(err, SendError::Connect { .. }));
        }
    }

    #[test]
    fn rejects_names_with_whitespace() {
        let timeout = Duration::from_millis(10);
        let mut client = TcpKegnetClient::new("127.0.0.1:1", timeout, timeout);

        let err = client.send_thermo_update("two words", 1.0).unwrap_err();
        assert!(matches!(err, SendError::InvalidName(_)));
        let err = client.send_meter_update("", 1).unwrap_err();
        assert!(matches!(err, SendError::InvalidName(_)));
    }
}
