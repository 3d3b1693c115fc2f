//! Error types for the bridge

use std::io;

use thiserror::Error;

use crate::queue::QueueClosed;

/// Errors raised while reading from the device
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Failed to open the serial port
    #[error("failed to open {path}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// The device stopped producing data (EOF)
    #[error("device disconnected")]
    Disconnected,

    /// Unrecoverable read error
    #[error("device read failed")]
    Read(#[from] io::Error),
}

/// Errors returned by a kegnet client send
#[derive(Debug, Error)]
pub enum SendError {
    /// Server address did not resolve to anything
    #[error("no address found for {0}")]
    Resolve(String),

    /// Could not connect to the server
    #[error("failed to connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Identifier cannot be carried on the wire
    #[error("invalid sensor name {0:?}")]
    InvalidName(String),

    /// Write failed or timed out
    #[error("send failed")]
    Io(#[from] io::Error),
}

/// Reasons the device I/O loop stops
#[derive(Debug, Error)]
pub enum IoLoopError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),
}
