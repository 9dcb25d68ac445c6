use super::meter_definitions::MeterIdentifier;
use super::obis_parser;
use super::structs::{MeasurementRecord, ReaderState, TELEGRAM_CAPACITY};
use super::utils;
use log::{debug, warn};

/// Line-framing state machine. Consumes one physical line at a time, finds
/// the telegram envelope between the `/` start marker and the `!` end marker,
/// and drives the OBIS parser for every data line in between.
///
/// The decoded record persists across cycles: a field that does not appear in
/// a given vendor's telegram keeps its previous value.
pub struct FramingReader {
    state: ReaderState,
    telegram: String,
    /// Byte length of the telegram prefix the checksum covers (`/` through
    /// `!` inclusive), set when the end marker is found.
    crc_input_len: usize,
    /// Hex checksum text following the end marker, when present.
    checksum: String,
    record: MeasurementRecord,
    meter: MeterIdentifier,
    inverse_tariff: bool,
}

impl FramingReader {
    pub fn new(inverse_tariff: bool) -> Self {
        FramingReader {
            state: ReaderState::Disabled,
            telegram: String::with_capacity(TELEGRAM_CAPACITY),
            crc_input_len: 0,
            checksum: String::new(),
            record: MeasurementRecord::default(),
            meter: MeterIdentifier::new(),
            inverse_tariff,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn record(&self) -> &MeasurementRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut MeasurementRecord {
        &mut self.record
    }

    /// Raw text of the telegram accumulated so far.
    pub fn telegram(&self) -> &str {
        &self.telegram
    }

    pub fn meter_name(&self) -> Option<&str> {
        self.meter.name()
    }

    /// Arm for a new cycle.
    pub fn begin_cycle(&mut self) {
        self.state = ReaderState::Waiting;
    }

    /// Force the cycle closed (timeout or controller disable).
    pub fn reset(&mut self) {
        self.state = ReaderState::Disabled;
    }

    /// Invalidate a completed cycle (checksum mismatch).
    pub fn invalidate(&mut self) {
        self.state = ReaderState::Fault;
    }

    /// Verify the captured checksum against the buffered envelope. Only
    /// meaningful in the Done state; a telegram without a checksum field
    /// fails verification.
    pub fn checksum_ok(&self) -> bool {
        let Some(hex) = self.checksum.get(..4) else {
            return false;
        };
        let Ok(expected) = u16::from_str_radix(hex, 16) else {
            return false;
        };
        let input = &self.telegram.as_bytes()[..self.crc_input_len.min(self.telegram.len())];
        utils::crc16(input) == expected
    }

    fn start_capture(&mut self, line: &str, marker: usize) {
        debug!("[P1] Start of telegram found");
        self.telegram.clear();
        self.checksum.clear();
        self.crc_input_len = 0;
        self.telegram.push_str(&line[marker..]);
        self.telegram.push_str("\r\n");
        self.state = ReaderState::Reading;
        self.meter.capture(line);
    }

    /// Feed one physical line, without its trailing newline. Lines longer
    /// than the line bound are truncated, the excess is dropped.
    pub fn feed_line(&mut self, line: &str) {
        let line = utils::truncate_line(line);
        if line.is_empty() {
            return;
        }

        match self.state {
            ReaderState::Waiting => {
                if let Some(marker) = line.find('/') {
                    self.start_capture(line, marker);
                }
                // not a start line, keep waiting
            }
            ReaderState::Reading => {
                // a new start marker mid-cycle restarts capture from that
                // point, it is not data
                if let Some(marker) = line.find('/') {
                    self.start_capture(line, marker);
                    return;
                }
                if let Some(end) = line.find('!') {
                    if self.telegram.len() + line.len() + 2 > TELEGRAM_CAPACITY {
                        warn!("[P1] Buffer overflow on end marker");
                        self.state = ReaderState::Fault;
                        return;
                    }
                    debug!("[P1] End of telegram found");
                    self.crc_input_len = self.telegram.len() + end + 1;
                    self.checksum.push_str(&line[end + 1..]);
                    self.telegram.push_str(line);
                    self.telegram.push_str("\r\n");
                    self.state = ReaderState::Done;
                    return;
                }
                if self.telegram.len() + line.len() + 2 > TELEGRAM_CAPACITY {
                    warn!("[P1] Buffer overflow before end marker");
                    self.state = ReaderState::Fault;
                    return;
                }
                self.telegram.push_str(line);
                self.telegram.push_str("\r\n");
                obis_parser::parse_line(line, &mut self.record, self.inverse_tariff);
            }
            // Disabled, Done and Fault consume nothing
            _ => {}
        }
    }
}
