//! Thread lifecycle for the bridge's long-running loops.

use std::io;
use std::thread::{self, JoinHandle};

use anyhow::anyhow;

use crate::shutdown::StopSignal;

/// A loop that runs on its own thread until it finishes or `stop` is requested.
pub trait Worker: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn name(&self) -> &str;

    fn run(self, stop: &StopSignal) -> Result<(), Self::Error>;
}

#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    handle: JoinHandle<anyhow::Result<()>>,
}

/// Spawns `worker` on a named thread.
pub fn start<W: Worker>(worker: W, stop: &StopSignal) -> io::Result<WorkerHandle> {
    let name = worker.name().to_owned();
    let stop = stop.clone();
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || worker.run(&stop).map_err(anyhow::Error::from))?;
    Ok(WorkerHandle { name, handle })
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> anyhow::Result<()> {
        match self.handle.join() {
            Ok(result) => result.map_err(|e| e.context(format!("{} failed", self.name))),
            Err(_) => Err(anyhow!("{} panicked", self.name)),
        }
    }
}
