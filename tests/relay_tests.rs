// Streaming relay tests: framing, fragmentation, translation

use bytes::Bytes;
use futures::StreamExt;
use gemgate::relay::{relay_sse, EventTranslator, SseFrame, SseFrameDecoder};
use gemgate::translation::streaming::{ClaudeStreamTranslator, OpenAiStreamTranslator};
use proptest::prelude::*;

fn gemini_sse_fixture() -> Vec<u8> {
    concat!(
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hel\"}]}}],\"usageMetadata\":{\"promptTokenCount\":4}}\n\n",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"lo \"}]}}]}\n\n",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"world\"}]},\"finishReason\":\"STOP\"}],\"usageMetadata\":{\"promptTokenCount\":4,\"candidatesTokenCount\":3}}\n\n",
        "data: [DONE]\n\n",
    )
    .as_bytes()
    .to_vec()
}

fn decode_all(decoder: &mut SseFrameDecoder, chunks: &[&[u8]]) -> Vec<SseFrame> {
    let mut frames = Vec::new();
    for chunk in chunks {
        frames.extend(decoder.push(chunk));
    }
    frames.extend(decoder.finish());
    frames
}

#[test]
fn test_whole_stream_decodes() {
    let bytes = gemini_sse_fixture();
    let mut decoder = SseFrameDecoder::new();
    let frames = decode_all(&mut decoder, &[&bytes]);

    assert_eq!(frames.len(), 4);
    assert!(matches!(frames[3], SseFrame::Done));
}

#[test]
fn test_fragmentation_at_every_boundary() {
    let bytes = gemini_sse_fixture();

    let mut whole = SseFrameDecoder::new();
    let expected = decode_all(&mut whole, &[&bytes]);

    for split in 1..bytes.len() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decode_all(&mut decoder, &[&bytes[..split], &bytes[split..]]);
        assert_eq!(frames, expected, "split at byte {} diverged", split);
    }
}

proptest! {
    /// Splitting the stream at arbitrary chunk sizes must never change the
    /// decoded frame sequence.
    #[test]
    fn prop_fragmentation_idempotent(sizes in prop::collection::vec(1usize..=24, 1..64)) {
        let bytes = gemini_sse_fixture();

        let mut whole = SseFrameDecoder::new();
        let expected = decode_all(&mut whole, &[&bytes]);

        let mut decoder = SseFrameDecoder::new();
        let mut frames = Vec::new();
        let mut offset = 0;
        let mut size_iter = sizes.iter().cycle();
        while offset < bytes.len() {
            let size = (*size_iter.next().unwrap()).min(bytes.len() - offset);
            frames.extend(decoder.push(&bytes[offset..offset + size]));
            offset += size;
        }
        frames.extend(decoder.finish());

        prop_assert_eq!(frames, expected);
    }
}

/// The spec scenario: one text-delta event in, exactly one outbound
/// text-delta followed by exactly one terminal event.
#[test]
fn test_claude_relay_delta_then_terminal() {
    let input = concat!(
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hi\"}]}}]}\n\n",
        "data: [DONE]\n\n",
    );

    let mut decoder = SseFrameDecoder::new();
    let mut translator = ClaudeStreamTranslator::new("claude-sonnet-4-5".to_string());

    let mut output = String::new();
    for frame in decoder.push(input.as_bytes()) {
        let bytes = match frame {
            SseFrame::Event(value) => translator.on_event(&value),
            SseFrame::Done => translator.on_done(),
        };
        for b in bytes {
            output.push_str(std::str::from_utf8(&b).unwrap());
        }
    }

    assert_eq!(output.matches("event: content_block_delta").count(), 1);
    assert_eq!(output.matches("event: message_stop").count(), 1);
    assert!(output.contains("\"text\":\"Hi\""));
    // Delta precedes the terminal event.
    let delta_pos = output.find("event: content_block_delta").unwrap();
    let stop_pos = output.find("event: message_stop").unwrap();
    assert!(delta_pos < stop_pos);
}

#[tokio::test]
async fn test_relay_sse_end_to_end_openai() {
    let bytes = gemini_sse_fixture();
    let chunks: Vec<reqwest::Result<Bytes>> = bytes
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    let upstream = futures::stream::iter(chunks);

    let translator = OpenAiStreamTranslator::new("gpt-4o".to_string());
    let out: Vec<Bytes> = relay_sse(upstream, translator)
        .map(|r| r.unwrap())
        .collect()
        .await;

    let text = out
        .iter()
        .map(|b| std::str::from_utf8(b).unwrap())
        .collect::<String>();

    // Role delta first, then content, then a finish chunk, then the sentinel.
    assert!(text.contains("\"role\":\"assistant\""));
    assert!(text.contains("\"content\":\"Hel\""));
    assert!(text.contains("\"finish_reason\":\"stop\""));
    assert!(text.ends_with("data: [DONE]\n\n"));
    assert_eq!(text.matches("data: [DONE]").count(), 1);
}

#[tokio::test]
async fn test_relay_sse_terminates_without_sentinel() {
    // Upstream closes without [DONE]; the terminal framing still happens
    // exactly once.
    let input = "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hi\"}]}}]}\n\n";
    let chunks: Vec<reqwest::Result<Bytes>> = vec![Ok(Bytes::from(input))];
    let upstream = futures::stream::iter(chunks);

    let translator = ClaudeStreamTranslator::new("claude-sonnet-4-5".to_string());
    let out: Vec<Bytes> = relay_sse(upstream, translator)
        .map(|r| r.unwrap())
        .collect()
        .await;

    let text = out
        .iter()
        .map(|b| std::str::from_utf8(b).unwrap())
        .collect::<String>();

    assert_eq!(text.matches("event: message_stop").count(), 1);
}

#[test]
fn test_malformed_event_skipped_and_stream_continues() {
    let input = concat!(
        "data: {broken json\n\n",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"ok\"}]}}]}\n\n",
    );

    let mut decoder = SseFrameDecoder::new();
    let frames = decoder.push(input.as_bytes());
    assert_eq!(frames.len(), 1);
    assert!(matches!(frames[0], SseFrame::Event(_)));
}

#[test]
fn test_oversized_garbage_does_not_kill_the_stream() {
    let mut decoder = SseFrameDecoder::with_capacity(1024);

    // Separator-free garbage well past the cap.
    let garbage = vec![b'x'; 4096];
    assert!(decoder.push(&garbage).is_empty());

    // A later well-formed frame still decodes.
    let frames = decoder.push(b"\n\ndata: {\"ok\":true}\n\n");
    assert!(frames
        .iter()
        .any(|f| matches!(f, SseFrame::Event(v) if v["ok"] == true)));
}
