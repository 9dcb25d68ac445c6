use crate::config::P1Config;
use crate::hal::{ControlLines, LineSource};
use crate::hub::NotificationHub;
use chrono::Utc;
use log::{info, warn};
use std::time::{Duration, Instant};

pub mod framing;
pub mod meter_definitions;
pub mod obis_parser;
pub mod structs;
pub mod utils;

use framing::FramingReader;
use structs::ReaderState;

/// Drives the request/release handshake and the read cycle.
///
/// One `tick()` per driver interval: opens the request window when the poll
/// deadline passes, feeds arriving lines to the framing reader, enforces the
/// read timeout, and publishes the snapshot exactly once on completion.
/// Every cycle terminates in Done, Fault or a timeout disable; the timeout
/// dominates, so no cycle can hang.
pub struct P1Reader {
    conf: P1Config,
    lines: Box<dyn LineSource>,
    control: Box<dyn ControlLines>,
    framing: FramingReader,
    hub: NotificationHub,
    next_update: Instant,
    timeout_at: Instant,
    last_sample: Option<Instant>,
}

impl P1Reader {
    pub fn new(conf: P1Config, lines: Box<dyn LineSource>, control: Box<dyn ControlLines>) -> Self {
        let framing = FramingReader::new(conf.inverse_tariff);
        P1Reader {
            conf,
            lines,
            control,
            framing,
            hub: NotificationHub::new(),
            // first tick opens the first request window
            next_update: Instant::now(),
            timeout_at: Instant::now(),
            last_sample: None,
        }
    }

    pub fn hub_mut(&mut self) -> &mut NotificationHub {
        &mut self.hub
    }

    pub fn state(&self) -> ReaderState {
        self.framing.state()
    }

    pub fn meter_name(&self) -> Option<&str> {
        self.framing.meter_name()
    }

    /// Last decoded snapshot (fields persist across cycles).
    pub fn record(&self) -> &structs::MeasurementRecord {
        self.framing.record()
    }

    /// When the last cycle completed, if any did.
    pub fn last_sample(&self) -> Option<Instant> {
        self.last_sample
    }

    /// Open the request window: enable the output buffer, assert data
    /// request, arm the read timeout.
    pub fn enable(&mut self, now: Instant) {
        info!("[P1] Data requested");
        self.lines.flush();
        self.control.set_output_enable(true);
        self.control.set_data_request(true);
        self.timeout_at = now + Duration::from_secs(self.conf.read_timeout);
        self.framing.begin_cycle();
    }

    /// Close the request window: release both control lines and schedule the
    /// next poll.
    pub fn disable(&mut self, now: Instant) {
        self.control.set_data_request(false);
        self.control.set_output_enable(false);
        self.framing.reset();
        self.next_update = now + Duration::from_secs(self.conf.interval);
    }

    /// One cooperative driver tick. All work for the tick (line consumption,
    /// decoding, notification fan-out) completes before this returns, so no
    /// subscriber observes a partially updated record.
    pub fn tick(&mut self, now: Instant) {
        if self.framing.state() == ReaderState::Disabled && now >= self.next_update {
            self.enable(now);
        }

        match self.framing.state() {
            ReaderState::Waiting | ReaderState::Reading => {
                if now >= self.timeout_at {
                    warn!("[P1] Read timeout");
                    self.disable(now);
                    return;
                }
                self.pump_lines(now);
            }
            _ => {}
        }
    }

    fn pump_lines(&mut self, now: Instant) {
        while let Some(line) = self.lines.poll_line() {
            self.framing.feed_line(&line);
            match self.framing.state() {
                ReaderState::Done => {
                    if self.conf.verify_checksum && !self.framing.checksum_ok() {
                        warn!("[P1] Checksum mismatch, dropping telegram");
                        self.framing.invalidate();
                        self.disable(now);
                        return;
                    }
                    info!("[P1] Telegram complete");
                    self.framing.record_mut().received_at = Some(Utc::now());
                    self.last_sample = Some(now);
                    let snapshot = self.framing.record().clone();
                    self.disable(now);
                    self.hub.publish(&snapshot);
                    return;
                }
                ReaderState::Fault => {
                    self.disable(now);
                    return;
                }
                _ => {}
            }
        }
    }
}
