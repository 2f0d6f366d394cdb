use crate::StreamError;

/// Longest line or event payload accepted before the channel is treated as malformed.
pub const MAX_SSE_LINE_BYTES: usize = 1 << 20;

/// Incremental `text/event-stream` framer yielding the `data` payload of each event.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    scanned: usize,
    data: Vec<String>,
    data_len: usize,
    max_line: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_SSE_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            data: Vec::new(),
            data_len: 0,
            max_line,
        }
    }

    /// Feeds raw bytes and returns every event completed by them, in order.
    ///
    /// Fails once a pending line or event payload grows past the limit.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, StreamError> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') else {
                self.scanned = self.buffer.len();
                break;
            };
            let line_end = self.scanned + offset;
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            self.scanned = 0;
            let line = String::from_utf8_lossy(&raw[..line_end]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
            if self.data_len > self.max_line {
                return Err(self.overflow("event data"));
            }
        }
        if self.buffer.len() > self.max_line {
            return Err(self.overflow("line"));
        }
        Ok(events)
    }

    fn overflow(&mut self, what: &str) -> StreamError {
        self.buffer.clear();
        self.scanned = 0;
        self.data.clear();
        self.data_len = 0;
        StreamError::Malformed(format!("{what} exceeds {} bytes", self.max_line))
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let data = self.data.join("\n");
            self.data.clear();
            self.data_len = 0;
            return Some(data);
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_len += value.len();
            self.data.push(value.to_string());
        }
        None
    }
}
