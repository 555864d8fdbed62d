//! Serial Distance Stream
//!
//! Async reading of distance announcements (`"Distância: 12.3 cm"`) from a
//! microcontroller over a serial link. Records arrive in arbitrary chunks
//! and are reassembled line by line; anything that is not an announcement
//! is ignored.

mod decoder;
mod error;
mod parser;
mod reader;
mod reading;

pub use decoder::Utf8ChunkDecoder;
pub use error::{LineError, TransportError};
pub use parser::{LineBuffer, LineParser, LinePattern, ParserStats, DEFAULT_MAX_LINE_BYTES};
pub use reader::{open_serial, DistanceReader, SerialConfig};
pub use reading::{DistanceReading, LinkState, ReadingSink};
