//! Serial read loop
//!
//! Reads the transport in arbitrary-sized chunks, decodes them as UTF-8 and
//! feeds the line parser. The read call is the loop's only suspension point.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::decoder::Utf8ChunkDecoder;
use crate::parser::{LineParser, LinePattern, ParserStats, DEFAULT_MAX_LINE_BYTES};
use crate::{LinkState, ReadingSink, TransportError};

/// Serial transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path (e.g. "/dev/ttyUSB0" or "COM3")
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Announcement format
    pub pattern: LinePattern,
    /// Cap on an unterminated record
    pub max_line_bytes: usize,
    /// Size of a single read
    pub read_buffer_bytes: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            pattern: LinePattern::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            read_buffer_bytes: 256,
        }
    }
}

/// Open the configured serial device
pub fn open_serial(config: &SerialConfig) -> Result<SerialStream, TransportError> {
    info!(
        "Opening serial port {} at {} baud",
        config.device, config.baud_rate
    );
    tokio_serial::new(&config.device, config.baud_rate)
        .open_native_async()
        .map_err(|e| TransportError::Open(format!("{}: {}", config.device, e)))
}

/// Decodes distance readings from a byte stream
pub struct DistanceReader {
    decoder: Utf8ChunkDecoder,
    parser: LineParser,
    read_buffer_bytes: usize,
}

impl DistanceReader {
    pub fn new(config: &SerialConfig) -> Self {
        Self {
            decoder: Utf8ChunkDecoder::new(),
            parser: LineParser::new(config.pattern.clone(), config.max_line_bytes),
            read_buffer_bytes: config.read_buffer_bytes.max(1),
        }
    }

    /// Read until the stream ends, publishing every reading.
    ///
    /// Returns why the loop stopped; [`TransportError::Closed`] is the
    /// normal end of stream.
    pub async fn run<R, S>(&mut self, mut stream: R, sink: &S) -> TransportError
    where
        R: AsyncRead + Unpin,
        S: ReadingSink + ?Sized,
    {
        sink.link_changed(LinkState::Connected);
        let mut buf = vec![0u8; self.read_buffer_bytes];

        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) => {
                    info!("Serial stream closed");
                    sink.link_changed(LinkState::Closed);
                    return TransportError::Closed;
                }
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::TimedOut) => {
                    debug!("Transient serial read error: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!("Serial read failed: {}", e);
                    sink.link_changed(LinkState::Failed(e.to_string()));
                    return TransportError::from(e);
                }
            };

            let text = self.decoder.decode(&buf[..n]);
            for reading in self.parser.feed(&text) {
                debug!("Distance: {:.1} cm", reading.distance_cm);
                sink.publish(reading);
            }
        }
    }

    pub fn stats(&self) -> ParserStats {
        self.parser.stats()
    }
}
