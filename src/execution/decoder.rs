// SPDX-License-Identifier: MIT

//! Newline-delimited JSON decoder for the execution stream
//!
//! Chunks arrive with arbitrary boundaries. The decoder buffers the partial
//! tail, parses every completed line on its own, and skips lines that fail
//! to parse so one corrupt record never costs the rest of the run.

use super::types::StreamEvent;

/// Longest record accepted before the pending line is discarded
pub const MAX_LINE_BYTES: usize = 1 << 20;

#[derive(Debug)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    max_line: usize,
    /// Dropping bytes of an oversized line until its newline arrives
    discarding: bool,
    skipped: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            discarding: false,
            skipped: 0,
        }
    }

    /// Feed a chunk and return every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            let line = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }
            let event = if self.buffer.is_empty() {
                self.parse_line(line)
            } else {
                self.buffer.extend_from_slice(line);
                let joined = std::mem::take(&mut self.buffer);
                self.parse_line(&joined)
            };
            events.extend(event);
        }

        if !self.discarding {
            self.buffer.extend_from_slice(rest);
            if self.buffer.len() > self.max_line {
                log::warn!(
                    "Skipping stream record longer than {} bytes",
                    self.max_line
                );
                self.skipped += 1;
                self.buffer = Vec::new();
                self.discarding = true;
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Option<StreamEvent> {
        self.discarding = false;
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.parse_line(&line)
    }

    /// Number of malformed lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn parse_line(&mut self, raw: &[u8]) -> Option<StreamEvent> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<StreamEvent>(line) {
            Ok(event) => Some(event),
            Err(e) => {
                self.skipped += 1;
                log::warn!("Skipping malformed stream record ({}): {}", e, line);
                None
            }
        }
    }
}

impl Default for NdjsonDecoder {
    fn default() -> Self {
        Self::new()
    }
}
