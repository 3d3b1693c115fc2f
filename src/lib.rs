//! Kegboard bridge: relays deduplicated sensor readings from a serial device
//! to a kegnet server.
//!
//! Two threads do the work. [`device_io::DeviceIoLoop`] blocks on the device
//! and posts every decoded message to a queue; [`manager::Manager`] drains the
//! queue, drops readings the [`cache::DuplicateSuppressingCache`] deems
//! redundant and hands the rest to a [`client::KegnetClient`]. A failing
//! client never stalls the device side.

pub mod cache;
pub mod client;
pub mod config;
pub mod decoder;
pub mod device_io;
pub mod error;
pub mod manager;
pub mod message;
pub mod queue;
pub mod serial_utils;
pub mod shutdown;
pub mod worker;

pub use cache::{CacheKey, DuplicateSuppressingCache, ReadingValue, SensorKind};
pub use client::{KegnetClient, TcpKegnetClient};
pub use config::Config;
pub use device_io::{DeviceIoLoop, MessageSource};
pub use error::{DeviceError, IoLoopError, SendError};
pub use manager::{Dispatch, Manager, ManagerStats};
pub use message::SensorMessage;
pub use queue::{message_queue, MessageInbox, MessagePoster, QueueItem, Received};
pub use shutdown::StopSignal;
pub use worker::{Worker, WorkerHandle};
