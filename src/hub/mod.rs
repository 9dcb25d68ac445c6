use crate::metering_p1::structs::MeasurementRecord;
use log::{info, warn};

/// Receives the completed snapshot, synchronously, on the driver's thread of
/// control. Implementations that need to do real work should hand the record
/// off (see [`ChannelSink`]) instead of doing it inline.
pub trait MeasurementSink {
    fn on_measurement(&mut self, record: &MeasurementRecord);
}

/// Fan-out of new-measurement events. Subscribers are invoked synchronously
/// in registration order, exactly once per completed cycle, with a read-only
/// view of the record.
pub struct NotificationHub {
    subscribers: Vec<(usize, Box<dyn MeasurementSink>)>,
    next_id: usize,
}

impl NotificationHub {
    pub fn new() -> Self {
        NotificationHub {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, sink: Box<dyn MeasurementSink>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, sink));
        id
    }

    pub fn unsubscribe(&mut self, id: usize) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn publish(&mut self, record: &MeasurementRecord) {
        for (_, sink) in self.subscribers.iter_mut() {
            sink.on_measurement(record);
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridges the synchronous fan-out onto a bounded tokio channel for async
/// consumers. A full channel drops the snapshot; the next cycle brings a
/// fresh one.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::Sender<MeasurementRecord>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, tokio::sync::mpsc::Receiver<MeasurementRecord>) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);
        (ChannelSink { tx }, rx)
    }
}

impl MeasurementSink for ChannelSink {
    fn on_measurement(&mut self, record: &MeasurementRecord) {
        if self.tx.try_send(record.clone()).is_err() {
            warn!("Measurement consumer is lagging, snapshot dropped");
        }
    }
}

/// Logs every completed snapshot as one JSON line.
#[derive(Debug, Default)]
pub struct JsonLogSink;

impl MeasurementSink for JsonLogSink {
    fn on_measurement(&mut self, record: &MeasurementRecord) {
        match serde_json::to_string(record) {
            Ok(json) => info!("{}", json),
            Err(e) => warn!("Failed to serialize measurement: {}", e),
        }
    }
}
