//! Text line adapter producing [`SensorMessage`]s from a byte stream.
//!
//! Lines look like `meter <name> <count>`, `thermo <name> <celsius>`,
//! `hello <version>` or `output <name> <0|1>`. Anything else is skipped.

use std::io::{BufRead, BufReader, ErrorKind, Read};

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::device_io::MessageSource;
use crate::error::DeviceError;
use crate::message::SensorMessage;

/// Longest line kept while waiting for its terminator.
pub const MAX_LINE_LEN: usize = 256;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static METER_RE: Lazy<Regex> = Lazy::new(|| regex(r"^meter\s+(\S+)\s+(\d+)$"));
static THERMO_RE: Lazy<Regex> = Lazy::new(|| regex(r"^thermo\s+(\S+)\s+(-?\d+(?:\.\d+)?)$"));
static HELLO_RE: Lazy<Regex> = Lazy::new(|| regex(r"^hello\s+(\d+)$"));
static OUTPUT_RE: Lazy<Regex> = Lazy::new(|| regex(r"^output\s+(\S+)\s+([01])$"));

pub fn parse_line(line: &str) -> Option<SensorMessage> {
    let line = line.trim();

    if let Some(caps) = METER_RE.captures(line) {
        return Some(SensorMessage::meter(&caps[1], caps[2].parse().ok()?));
    }
    if let Some(caps) = THERMO_RE.captures(line) {
        return Some(SensorMessage::thermo(&caps[1], caps[2].parse().ok()?));
    }
    if let Some(caps) = HELLO_RE.captures(line) {
        return Some(SensorMessage::Hello {
            firmware_version: caps[1].parse().ok()?,
        });
    }
    if let Some(caps) = OUTPUT_RE.captures(line) {
        return Some(SensorMessage::OutputStatus {
            output_name: caps[1].to_owned(),
            enabled: &caps[2] == "1",
        });
    }
    None
}

/// Reads newline-terminated messages from a device with a read timeout.
///
/// A timeout returns `Ok(None)` and keeps the partial line for the next call.
/// Lines longer than [`MAX_LINE_LEN`] are dropped up to their terminator.
pub struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    overlong: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::with_capacity(64),
            overlong: false,
        }
    }
}

impl<R: Read> MessageSource for LineReader<R> {
    fn next_message(&mut self) -> Result<Option<SensorMessage>, DeviceError> {
        loop {
            let room = (MAX_LINE_LEN - self.pending.len()) as u64;
            let mut limited = self.reader.by_ref().take(room);
            match limited.read_until(b'\n', &mut self.pending) {
                Ok(0) => return Err(DeviceError::Disconnected),
                Ok(_) if self.pending.ends_with(b"\n") => {}
                Ok(_) if self.pending.len() >= MAX_LINE_LEN => {
                    trace!("Discarding overlong line ({} bytes)", self.pending.len());
                    self.pending.clear();
                    self.overlong = true;
                    continue;
                }
                // EOF in the middle of a line.
                Ok(_) => return Err(DeviceError::Disconnected),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }

            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            if std::mem::take(&mut self.overlong) {
                continue;
            }
            match parse_line(&line) {
                Some(message) => return Ok(Some(message)),
                None if line.trim().is_empty() => {}
                None => trace!("Skipping unrecognised line: {:?}", line.trim()),
            }
        }
    }
}
