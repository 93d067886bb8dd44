use crate::deframe::Deframer;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

// Telemetry objects are well under 1 KiB; anything this large without a
// frame boundary is a stuck or noisy link.
pub const MAX_BUFFER_LEN: usize = 64 * 1024;
const TERMINATOR: char = '}';

/// How frame boundaries are located in the text stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingMode {
    /// A frame ends at the first `}` in the buffer.
    ///
    /// Nested objects and `}` inside string values desynchronize the stream,
    /// which is how the pod firmware's peers have always read it.
    #[default]
    FirstBrace,
    /// A frame ends where the brace depth of its opening `{` returns to zero,
    /// ignoring braces inside string literals.
    Balanced,
}

/// One candidate frame cut out of the stream. It is not guaranteed to be
/// valid JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(pub String);

impl RawFrame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct BalancedScan {
    pos: usize,   // next byte to look at
    start: usize, // offset of the opening brace of the current frame
    depth: usize,
    in_string: bool,
    escaped: bool,
}

/// Splits a text stream of back-to-back JSON objects into [`RawFrame`]s.
pub struct JsonDeframer {
    mode: FramingMode,
    buffer: String,
    max_len: usize,
    scan: BalancedScan,
}

impl JsonDeframer {
    pub fn new(mode: FramingMode) -> Self {
        Self::with_max_len(mode, MAX_BUFFER_LEN)
    }

    pub fn with_max_len(mode: FramingMode, max_len: usize) -> Self {
        Self {
            mode,
            buffer: String::new(),
            max_len,
            scan: BalancedScan::default(),
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// The unconsumed text: empty, or a partial frame waiting for more input.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scan = BalancedScan::default();
    }

    fn next_first_brace(&mut self) -> Option<RawFrame> {
        let end = self.buffer.find(TERMINATOR)? + TERMINATOR.len_utf8();
        let rest = self.buffer.split_off(end);

        Some(RawFrame(std::mem::replace(&mut self.buffer, rest)))
    }

    fn next_balanced(&mut self) -> Option<RawFrame> {
        let mut scan = self.scan;
        let mut end = None;

        // Only ASCII bytes are compared, so every cut lands on a char boundary.
        for &byte in &self.buffer.as_bytes()[scan.pos..] {
            scan.pos += 1;

            if scan.depth == 0 {
                if byte == b'{' {
                    scan.start = scan.pos - 1;
                    scan.depth = 1;
                }
                continue;
            }

            if scan.in_string {
                if scan.escaped {
                    scan.escaped = false;
                } else if byte == b'\\' {
                    scan.escaped = true;
                } else if byte == b'"' {
                    scan.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => scan.in_string = true,
                b'{' => scan.depth += 1,
                b'}' => {
                    scan.depth -= 1;
                    if scan.depth == 0 {
                        end = Some(scan.pos);
                        break;
                    }
                }
                _ => {}
            }
        }

        if let Some(end) = end {
            if scan.start > 0 {
                debug!("[DEFRAMER] Skipping {} bytes before frame", scan.start);
            }
            let rest = self.buffer.split_off(end);
            let frame = self.buffer[scan.start..].to_string();
            self.buffer = rest;
            self.scan = BalancedScan::default();

            return Some(RawFrame(frame));
        }

        if scan.depth == 0 {
            // nothing but noise so far
            self.buffer.clear();
            self.scan = BalancedScan::default();
        } else {
            self.buffer.drain(..scan.start);
            scan.pos -= scan.start;
            scan.start = 0;
            self.scan = scan;
        }

        None
    }
}

impl Default for JsonDeframer {
    fn default() -> Self {
        Self::new(FramingMode::default())
    }
}

impl Deframer for JsonDeframer {
    type Frame = RawFrame;

    fn push(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
    }

    fn next_frame(&mut self) -> Option<RawFrame> {
        let frame = match self.mode {
            FramingMode::FirstBrace => self.next_first_brace(),
            FramingMode::Balanced => self.next_balanced(),
        };

        // Drop buffer if it grows too large (a link that never terminates a frame)
        if frame.is_none() && self.buffer.len() > self.max_len {
            warn!(
                "[DEFRAMER] Discarding {} buffered bytes without a frame boundary",
                self.buffer.len()
            );
            self.clear();
        }

        frame
    }
}
