//! Per-resource command channels for mission and return-to-base tasks.
//!
//! A sender waits until the running task has taken its signal, or gives up
//! after a deadline. Tasks take signals with a non-blocking [`CommandChannel::poll`]
//! once per tick, so a signal lands at most one tick after it is sent.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSignal {
    /// A new mission takes over the resource.
    Start,
    /// Stop the running mission or return.
    Stop,
}

struct Envelope {
    signal: TaskSignal,
    ack: oneshot::Sender<()>,
}

pub struct CommandChannel {
    tx: mpsc::Sender<Envelope>,
    rx: Mutex<mpsc::Receiver<Envelope>>,
}

impl CommandChannel {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Take a pending signal without waiting. Signals whose sender already
    /// gave up are dropped.
    pub fn poll(&self) -> Option<TaskSignal> {
        let Ok(mut rx) = self.rx.lock() else {
            return None;
        };
        while let Ok(envelope) = rx.try_recv() {
            if envelope.ack.send(()).is_ok() {
                return Some(envelope.signal);
            }
        }
        None
    }

    /// Hand `signal` to the running task, waiting at most `wait`. Returns
    /// false when no task took it in time; the signal is then discarded.
    pub async fn deliver(&self, signal: TaskSignal, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        let (ack, acked) = oneshot::channel();

        match timeout_at(deadline, self.tx.send(Envelope { signal, ack })).await {
            Ok(Ok(())) => {}
            _ => return false,
        }
        matches!(timeout_at(deadline, acked).await, Ok(Ok(())))
    }
}

/// Lazily created command channels, one per resource for the whole run.
#[derive(Default)]
pub struct CommandChannels {
    channels: DashMap<String, Arc<CommandChannel>>,
}

impl CommandChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, resource_id: &str) -> Arc<CommandChannel> {
        self.channels
            .entry(resource_id.to_string())
            .or_insert_with(|| Arc::new(CommandChannel::new()))
            .clone()
    }
}
