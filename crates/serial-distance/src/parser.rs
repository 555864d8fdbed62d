//! Line reassembly and distance announcement parsing

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DistanceReading, LineError};

/// Default cap on an unterminated record
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024;

/// Accumulates text between reads.
///
/// After every [`push`](Self::push) the buffer holds at most one incomplete
/// record; every newline-terminated record has been handed back. A record
/// longer than the cap is handed back cut to its first `max_pending` bytes,
/// and the rest of it up to the next newline is skipped.
#[derive(Debug)]
pub struct LineBuffer {
    pending: String,
    max_pending: usize,
    /// Skipping the tail of an overlong record
    discarding: bool,
}

impl LineBuffer {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: String::new(),
            max_pending,
            discarding: false,
        }
    }

    /// Append a chunk and return every completed line, without newlines
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        let mut chunk = chunk;
        if self.discarding {
            match chunk.find('\n') {
                Some(pos) => {
                    chunk = &chunk[pos + 1..];
                    self.discarding = false;
                }
                None => return Vec::new(),
            }
        }
        self.pending.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let rest = self.pending.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.pending, rest);
            line.truncate(pos);
            truncate_at_boundary(&mut line, self.max_pending);
            lines.push(line);
        }

        if self.pending.len() > self.max_pending {
            debug!(
                "Cutting {} bytes of unterminated serial input to {}",
                self.pending.len(),
                self.max_pending
            );
            let mut line = std::mem::take(&mut self.pending);
            truncate_at_boundary(&mut line, self.max_pending);
            lines.push(line);
            self.discarding = true;
        }

        lines
    }

    /// The incomplete record, if any
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Whether input is being skipped up to the next newline
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }
}

fn truncate_at_boundary(line: &mut String, max: usize) {
    if line.len() <= max {
        return;
    }
    let mut cut = max;
    while !line.is_char_boundary(cut) {
        cut -= 1;
    }
    line.truncate(cut);
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

/// `"<token>: <number> <unit>"` announcement format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinePattern {
    /// Announcement token before the colon
    pub token: String,
    /// Unit suffix after the number
    pub unit: String,
}

impl Default for LinePattern {
    fn default() -> Self {
        Self {
            token: "Distância".to_string(),
            unit: "cm".to_string(),
        }
    }
}

impl LinePattern {
    /// Extract the distance from one line.
    ///
    /// The announcement may be preceded by other text on the line, including
    /// other occurrences of the token; the first occurrence that forms a
    /// complete announcement wins. The number is a run of ASCII digits and
    /// dots.
    pub fn parse(&self, line: &str) -> Result<f64, LineError> {
        if self.token.is_empty() {
            return Err(LineError::NoMatch);
        }
        let line = line.trim();

        let mut malformed = None;
        for (token_at, _) in line.match_indices(self.token.as_str()) {
            match self.parse_after(&line[token_at + self.token.len()..]) {
                Ok(distance) => return Ok(distance),
                Err(LineError::NoMatch) => {}
                Err(e) => {
                    malformed.get_or_insert(e);
                }
            }
        }
        Err(malformed.unwrap_or(LineError::NoMatch))
    }

    /// Parse `": <number> <unit>"` following one token occurrence
    fn parse_after(&self, after_token: &str) -> Result<f64, LineError> {
        let after_colon = after_token.strip_prefix(':').ok_or(LineError::NoMatch)?;

        let body = after_colon.trim_start();
        let number_len = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        if number_len == 0 {
            return Err(LineError::NoMatch);
        }
        let (number, rest) = body.split_at(number_len);

        if !rest.trim_start().starts_with(self.unit.as_str()) {
            return Err(LineError::NoMatch);
        }

        number
            .parse::<f64>()
            .map_err(|_| LineError::MalformedNumber(number.to_string()))
    }
}

/// Parser counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParserStats {
    /// Complete lines seen
    pub lines: u64,
    /// Lines that produced a reading
    pub readings: u64,
    /// Lines dropped as unrelated or malformed
    pub dropped: u64,
}

/// Streaming distance parser
#[derive(Debug)]
pub struct LineParser {
    buffer: LineBuffer,
    pattern: LinePattern,
    stats: ParserStats,
}

impl LineParser {
    pub fn new(pattern: LinePattern, max_line_bytes: usize) -> Self {
        Self {
            buffer: LineBuffer::new(max_line_bytes),
            pattern,
            stats: ParserStats::default(),
        }
    }

    /// Feed one decoded chunk; returns the readings it completed, in order
    pub fn feed(&mut self, chunk: &str) -> Vec<DistanceReading> {
        let mut readings = Vec::new();

        for line in self.buffer.push(chunk) {
            self.stats.lines += 1;
            match self.pattern.parse(&line) {
                Ok(distance_cm) => {
                    self.stats.readings += 1;
                    readings.push(DistanceReading::now(distance_cm));
                }
                Err(e) => {
                    self.stats.dropped += 1;
                    debug!("Ignored serial line {:?}: {}", line.trim(), e);
                }
            }
        }

        readings
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(LinePattern::default(), DEFAULT_MAX_LINE_BYTES)
    }
}
