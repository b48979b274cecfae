//! Newline framing for the upstream byte stream.
//!
//! Dify terminates every event line with `\n`. Chunks from the HTTP body can
//! end anywhere: mid-line, mid-JSON token or inside a multi-byte UTF-8
//! sequence. The decoder keeps the unterminated tail and only releases
//! complete lines.
use memchr::memchr_iter;
use smallvec::SmallVec;

/// Lines released by one [`LineDecoder::feed`] call.
pub type DecodedLines = SmallVec<[String; 4]>;

/// Incremental line splitter.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to contain no `\n`.
    scanned: usize,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk and return every line it completes, in order.
    ///
    /// Returned lines exclude the `\n` and a trailing `\r`. The trailing
    /// partial segment stays buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> DecodedLines {
        let mut lines = DecodedLines::new();
        self.feed_into(chunk, &mut lines);
        lines
    }

    /// Same as [`LineDecoder::feed`], appending into a caller-provided buffer.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut DecodedLines) {
        if chunk.is_empty() {
            return;
        }
        self.buffer.extend_from_slice(chunk);

        let scan_start = self.scanned;
        let mut line_start = 0usize;
        for rel_pos in memchr_iter(b'\n', &self.buffer[scan_start..]) {
            let line_end = scan_start + rel_pos;
            out.push(decode_line(&self.buffer[line_start..line_end]));
            line_start = line_end + 1;
        }

        if line_start > 0 {
            self.buffer.drain(..line_start);
        }
        self.scanned = self.buffer.len();
    }

    /// Flush the buffered tail at end of stream.
    ///
    /// Returns it as a final line only if it holds something other than
    /// whitespace.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        let tail = std::mem::take(&mut self.buffer);
        if tail.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(decode_line(&tail))
    }

    /// Number of buffered bytes not yet released as a line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
