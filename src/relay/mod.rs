//! Streaming relay: upstream SSE bytes → outbound protocol SSE bytes.
//!
//! The pipeline is an explicit pull chain with explicit termination:
//! bytes are decoded into frames by [`SseFrameDecoder`], each frame is
//! handed to an [`EventTranslator`] which re-serializes it into the target
//! protocol's event vocabulary, and the resulting bytes are forwarded
//! downstream immediately. Each upstream event maps to at most one outbound
//! emission per event object; nothing is batched across events.
//!
//! The decoder's internal buffer is capped; on overflow the oldest half is
//! discarded with a warning. Losing partial malformed data is preferable to
//! unbounded memory growth or killing the connection.

use crate::error::ErrorEnvelope;
use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;
use serde_json::Value;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

/// Cap on the internal reassembly buffer.
pub const MAX_BUFFER_BYTES: usize = 1024 * 1024;

/// Interval between keep-alive emissions while the upstream is idle.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// One decoded upstream frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// A parsed `data: <json>` event object.
    Event(Value),
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental SSE frame decoder with a bounded reassembly buffer.
///
/// Feeding the same byte stream split at arbitrary boundaries produces the
/// same frame sequence: splitting only ever defers a frame to a later
/// `push`, never changes it.
pub struct SseFrameDecoder {
    buffer: Vec<u8>,
    max_buffer: usize,
    done: bool,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_BYTES)
    }

    pub fn with_capacity(max_buffer: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffer,
            done: false,
        }
    }

    /// Append a chunk and drain every complete frame it closes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        if self.done {
            return Vec::new();
        }

        self.buffer.extend_from_slice(chunk);
        self.enforce_cap();

        let mut frames = Vec::new();
        while let Some((frame_end, skip)) = find_frame_boundary(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..frame_end + skip).collect();
            let text = String::from_utf8_lossy(&raw[..frame_end]);

            if let Some(frame) = parse_frame(&text) {
                let is_done = matches!(frame, SseFrame::Done);
                frames.push(frame);
                if is_done {
                    self.done = true;
                    break;
                }
            }
        }
        frames
    }

    /// Flush at stream close: a trailing frame without its separator is
    /// still parsed; anything unparseable is logged and dropped.
    pub fn finish(&mut self) -> Vec<SseFrame> {
        if self.done {
            return Vec::new();
        }
        self.done = true;

        let leftover = std::mem::take(&mut self.buffer);
        if leftover.iter().all(|b| b.is_ascii_whitespace()) {
            return Vec::new();
        }

        let text = String::from_utf8_lossy(&leftover);
        match parse_frame(&text) {
            Some(frame) => vec![frame],
            None => {
                warn!(
                    bytes = leftover.len(),
                    "stream closed with unconsumed buffered content"
                );
                Vec::new()
            }
        }
    }

    fn enforce_cap(&mut self) {
        if self.buffer.len() > self.max_buffer {
            let drop = self.buffer.len() / 2;
            self.buffer.drain(..drop);
            warn!(
                dropped = drop,
                retained = self.buffer.len(),
                "SSE buffer exceeded cap, discarded oldest half"
            );
        }
    }
}

impl Default for SseFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Locate the next frame separator: `\n\n`, tolerating CRLF line endings.
/// Returns (frame length, separator length).
fn find_frame_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' {
            if buf[i + 1] == b'\n' {
                return Some((i, 2));
            }
            if buf[i + 1] == b'\r' && buf.get(i + 2) == Some(&b'\n') {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}

/// Parse one frame's text into an event.
///
/// Only the first `data:` line is considered; a frame whose data fails JSON
/// parsing is dropped with a warning and the stream continues.
fn parse_frame(text: &str) -> Option<SseFrame> {
    let data = text.lines().find_map(|line| {
        line.strip_prefix("data:").map(|rest| rest.trim_start())
    })?;

    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(SseFrame::Done);
    }

    match serde_json::from_str::<Value>(data) {
        Ok(value) => Some(SseFrame::Event(value)),
        Err(e) => {
            warn!(error = %e, "dropping malformed SSE event");
            debug!(raw = %data.chars().take(200).collect::<String>(), "malformed event data");
            None
        }
    }
}

/// Per-protocol event re-serialization.
///
/// Implementations hold whatever per-stream state the target vocabulary
/// needs (open block indices, synthesized ids) and must emit their terminal
/// framing exactly once even if both the done-sentinel and the stream close
/// are observed.
pub trait EventTranslator: Send {
    /// One upstream event object → zero or more outbound frames.
    fn on_event(&mut self, event: &Value) -> Vec<Bytes>;

    /// Terminal framing (done-sentinel seen, or upstream closed).
    fn on_done(&mut self) -> Vec<Bytes>;

    /// An upstream failure, already classified; translated into the target
    /// protocol's error event before the stream closes.
    fn on_error(&mut self, envelope: &ErrorEnvelope) -> Vec<Bytes>;

    /// Optional keep-alive frame while the upstream is idle.
    fn keepalive(&mut self) -> Option<Bytes> {
        None
    }
}

/// Drive an upstream byte stream through a translator, producing the
/// outbound byte stream.
///
/// Termination is exactly-once: done-sentinel, upstream close, or upstream
/// error, whichever comes first. Dropping the returned stream (caller
/// disconnect) drops the upstream connection with it; nothing drains in the
/// background.
pub fn relay_sse<S, T>(
    upstream: S,
    mut translator: T,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    T: EventTranslator + 'static,
{
    async_stream::stream! {
        let mut decoder = SseFrameDecoder::new();
        futures::pin_mut!(upstream);

        let mut terminated = false;
        loop {
            tokio::select! {
                chunk = upstream.next() => {
                    match chunk {
                        Some(Ok(bytes)) => {
                            for frame in decoder.push(&bytes) {
                                match frame {
                                    SseFrame::Event(value) => {
                                        for out in translator.on_event(&value) {
                                            yield Ok::<Bytes, Infallible>(out);
                                        }
                                    }
                                    SseFrame::Done => {
                                        for out in translator.on_done() {
                                            yield Ok(out);
                                        }
                                        terminated = true;
                                    }
                                }
                            }
                            if terminated {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "upstream stream error");
                            let envelope = ErrorEnvelope::network(e.to_string());
                            for out in translator.on_error(&envelope) {
                                yield Ok(out);
                            }
                            terminated = true;
                            break;
                        }
                        None => {
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(KEEPALIVE_INTERVAL) => {
                    if let Some(frame) = translator.keepalive() {
                        debug!("emitting keep-alive frame");
                        yield Ok(frame);
                    }
                }
            }
        }

        if !terminated {
            // Upstream closed without a sentinel: flush the tail, then
            // emit the terminal framing once.
            for frame in decoder.finish() {
                match frame {
                    SseFrame::Event(value) => {
                        for out in translator.on_event(&value) {
                            yield Ok(out);
                        }
                    }
                    SseFrame::Done => {}
                }
            }
            for out in translator.on_done() {
                yield Ok(out);
            }
        }

        debug!("relay stream ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Vec<u8> {
        concat!(
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hel\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"lo\"}]},\"finishReason\":\"STOP\"}]}\n\n",
            "data: [DONE]\n\n",
        )
        .as_bytes()
        .to_vec()
    }

    #[test]
    fn test_single_push_decodes_all_frames() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.push(&fixture());
        assert_eq!(frames.len(), 3);
        assert!(matches!(frames[2], SseFrame::Done));
    }

    #[test]
    fn test_byte_at_a_time_matches_single_push() {
        let bytes = fixture();

        let mut whole = SseFrameDecoder::new();
        let mut expected = whole.push(&bytes);
        expected.extend(whole.finish());

        let mut fragmented = SseFrameDecoder::new();
        let mut actual = Vec::new();
        for b in &bytes {
            actual.extend(fragmented.push(std::slice::from_ref(b)));
        }
        actual.extend(fragmented.finish());

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_crlf_framing() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.push(b"data: {\"a\":1}\r\n\r\ndata: [DONE]\r\n\r\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], SseFrame::Event(json!({"a": 1})));
        assert_eq!(frames[1], SseFrame::Done);
    }

    #[test]
    fn test_malformed_event_dropped_stream_continues() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.push(b"data: {not json}\n\ndata: {\"ok\":true}\n\n");
        assert_eq!(frames, vec![SseFrame::Event(json!({"ok": true}))]);
    }

    #[test]
    fn test_trailing_frame_without_separator_flushed_on_finish() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.push(b"data: {\"tail\":1}");
        assert!(frames.is_empty());
        let flushed = decoder.finish();
        assert_eq!(flushed, vec![SseFrame::Event(json!({"tail": 1}))]);
    }

    #[test]
    fn test_nothing_after_done() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.push(b"data: [DONE]\n\ndata: {\"late\":1}\n\n");
        assert_eq!(frames, vec![SseFrame::Done]);
        assert!(decoder.push(b"data: {\"more\":1}\n\n").is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_buffer_cap_discards_oldest_half() {
        let mut decoder = SseFrameDecoder::with_capacity(64);
        // A separator-free run well past the cap.
        let garbage = vec![b'x'; 200];
        let frames = decoder.push(&garbage);
        assert!(frames.is_empty());
        assert!(decoder.buffer.len() <= 128);

        // Later well-formed events still come through.
        let frames = decoder.push(b"\n\ndata: {\"ok\":1}\n\n");
        assert!(frames.contains(&SseFrame::Event(json!({"ok": 1}))));
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.push(b"event: ping\n\ndata: {\"x\":1}\n\n");
        assert_eq!(frames, vec![SseFrame::Event(json!({"x": 1}))]);
    }
}
