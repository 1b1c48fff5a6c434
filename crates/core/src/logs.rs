//! Per-deployment log fan-out.
//!
//! Every pipeline stage appends line-structured text keyed by deployment id;
//! viewers subscribe for a live stream. Channels are bounded and the sink
//! retains only the most recent deployments, evicting the oldest channel
//! when the cap is reached.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

pub struct LogSink {
    inner: Mutex<SinkState>,
    channel_capacity: usize,
    max_deployments: usize,
}

struct SinkState {
    channels: HashMap<String, broadcast::Sender<String>>,
    order: VecDeque<String>,
}

impl LogSink {
    pub fn new(channel_capacity: usize, max_deployments: usize) -> Self {
        Self {
            inner: Mutex::new(SinkState {
                channels: HashMap::new(),
                order: VecDeque::new(),
            }),
            channel_capacity: channel_capacity.max(1),
            max_deployments: max_deployments.max(1),
        }
    }

    /// Append one line to a deployment's stream. Lagging or absent
    /// subscribers are never an error.
    pub fn append(&self, deployment_id: &str, line: impl Into<String>) {
        let line = line.into();
        let sender = self.sender(deployment_id);
        // send only fails when there are no receivers; that is fine.
        let _ = sender.send(line);
    }

    /// Live subscription to a deployment's stream. Lines appended before the
    /// subscriber attached are not replayed.
    pub fn subscribe(&self, deployment_id: &str) -> broadcast::Receiver<String> {
        self.sender(deployment_id).subscribe()
    }

    /// Drop a deployment's channel explicitly. Attached receivers see the
    /// stream close.
    pub fn evict(&self, deployment_id: &str) {
        let mut state = self.inner.lock().unwrap();
        state.channels.remove(deployment_id);
        state.order.retain(|id| id != deployment_id);
    }

    pub fn retained(&self) -> usize {
        self.inner.lock().unwrap().channels.len()
    }

    fn sender(&self, deployment_id: &str) -> broadcast::Sender<String> {
        let mut state = self.inner.lock().unwrap();
        if let Some(sender) = state.channels.get(deployment_id) {
            return sender.clone();
        }

        while state.order.len() >= self.max_deployments {
            if let Some(oldest) = state.order.pop_front() {
                debug!(deployment = %oldest, "Evicting oldest log channel");
                state.channels.remove(&oldest);
            }
        }

        let (sender, _) = broadcast::channel(self.channel_capacity);
        state
            .channels
            .insert(deployment_id.to_string(), sender.clone());
        state.order.push_back(deployment_id.to_string());
        sender
    }
}

/// Cheap per-deployment handle passed into every pipeline stage.
#[derive(Clone)]
pub struct LogStream {
    sink: std::sync::Arc<LogSink>,
    deployment_id: String,
}

impl LogStream {
    pub fn new(sink: std::sync::Arc<LogSink>, deployment_id: impl Into<String>) -> Self {
        Self {
            sink,
            deployment_id: deployment_id.into(),
        }
    }

    pub fn append(&self, line: impl Into<String>) {
        self.sink.append(&self.deployment_id, line);
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }
}
