use super::{ChannelLineSource, HalError, LineSource};
use crate::metering_p1::structs::MAX_LINE_LEN;
use log::{error, info};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::Sender;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Telegram line source over a serial port. A reader task splits the byte
/// stream on `\n`, strips `\r`, truncates each line to the line bound and
/// feeds a bounded channel drained by the driver tick.
pub struct SerialLineSource {
    inner: ChannelLineSource,
    _task: tokio::task::JoinHandle<()>,
}

impl SerialLineSource {
    /// Must be called from within a tokio runtime.
    pub fn open(port: &str, baud: u32) -> Result<Self, HalError> {
        let stream = tokio_serial::new(port, baud).open_native_async()?;
        info!("[P1] Serial port {} open at {} baud", port, baud);
        let (tx, inner) = ChannelLineSource::new(64);
        let task = tokio::spawn(read_loop(stream, tx));
        Ok(SerialLineSource { inner, _task: task })
    }
}

impl LineSource for SerialLineSource {
    fn poll_line(&mut self) -> Option<String> {
        self.inner.poll_line()
    }

    fn flush(&mut self) {
        self.inner.flush();
    }
}

async fn read_loop(mut stream: SerialStream, tx: Sender<String>) {
    let mut buf = [0u8; 256];
    let mut line = String::new();
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => {
                error!("[P1] Serial stream closed");
                return;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    match byte {
                        b'\n' => {
                            // a full channel drops the line rather than
                            // buffering unboundedly
                            let _ = tx.try_send(std::mem::take(&mut line));
                        }
                        b'\r' => {}
                        _ => {
                            if line.len() < MAX_LINE_LEN {
                                line.push(byte as char);
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("[P1] Serial read error: {}", e);
                return;
            }
        }
    }
}
