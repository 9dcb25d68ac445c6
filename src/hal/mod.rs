use log::debug;
use thiserror::Error;

pub mod serial;

#[cfg(feature = "gpio")]
pub mod gpio;

#[derive(Error, Debug)]
pub enum HalError {
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
    #[cfg(feature = "gpio")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// Non-blocking source of telegram lines. Implementations deliver one
/// physical line per call, stripped of its line ending and truncated to the
/// line bound; excess bytes are dropped, not buffered.
pub trait LineSource {
    fn poll_line(&mut self) -> Option<String>;

    /// Discard whatever is pending, used when a request window opens.
    fn flush(&mut self);
}

/// The two hardware control signals of the request/release handshake.
///
/// Data request is asserted while a telegram is awaited. The output-enable
/// buffer is active only during the request window, releasing the shared bus
/// to tristate otherwise.
pub trait ControlLines {
    fn set_data_request(&mut self, asserted: bool);
    fn set_output_enable(&mut self, active: bool);
}

/// Control lines for hosts without the level-shifter hardware; state changes
/// only show up in the log.
#[derive(Debug, Default)]
pub struct NullControlLines;

impl ControlLines for NullControlLines {
    fn set_data_request(&mut self, asserted: bool) {
        debug!("[P1] Data request {}", if asserted { "asserted" } else { "released" });
    }

    fn set_output_enable(&mut self, active: bool) {
        debug!("[P1] Output enable {}", if active { "active" } else { "tristate" });
    }
}

/// LineSource over a bounded channel, fed by an async reader task. The
/// synchronous tick drains it without blocking; when the channel is full the
/// producer drops lines instead of buffering them.
pub struct ChannelLineSource {
    rx: tokio::sync::mpsc::Receiver<String>,
}

impl ChannelLineSource {
    pub fn new(capacity: usize) -> (tokio::sync::mpsc::Sender<String>, Self) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);
        (tx, ChannelLineSource { rx })
    }
}

impl LineSource for ChannelLineSource {
    fn poll_line(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    fn flush(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_line_source_poll_and_flush() {
        let (tx, mut source) = ChannelLineSource::new(4);
        tx.try_send("a".to_string()).unwrap();
        tx.try_send("b".to_string()).unwrap();
        assert_eq!(source.poll_line().as_deref(), Some("a"));

        tx.try_send("c".to_string()).unwrap();
        source.flush();
        assert_eq!(source.poll_line(), None);
    }

    #[test]
    fn test_channel_line_source_bounded() {
        let (tx, _source) = ChannelLineSource::new(2);
        tx.try_send("a".to_string()).unwrap();
        tx.try_send("b".to_string()).unwrap();
        // full channel rejects instead of buffering
        assert!(tx.try_send("c".to_string()).is_err());
    }
}
