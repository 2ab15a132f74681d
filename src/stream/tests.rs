use super::*;
use crate::error::{AppError, AppResult};

fn delta(text: &str) -> String {
    format!(
        "data: {{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{{\"type\":\"text_delta\",\"text\":{}}}}}\n",
        serde_json::Value::String(text.to_owned())
    )
}

fn sample_stream() -> String {
    let mut stream = String::new();
    stream.push_str("event: message_start\n");
    stream.push_str("data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n");
    stream.push_str("event: content_block_delta\n");
    stream.push_str(&delta("Hel"));
    stream.push('\n');
    stream.push_str(&delta("lo, "));
    stream.push_str(&delta("wörld ✓"));
    stream.push_str("data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n");
    stream.push_str("data: [DONE]\n");
    stream
}

fn collect_text(chunks: &[&[u8]]) -> (String, FlushReport) {
    let mut decoder = Utf8ChunkDecoder::new();
    let mut parser = StreamFrameParser::new();
    let mut text = String::new();
    for chunk in chunks {
        let decoded = decoder.decode(chunk);
        parser.push(&decoded, |fragment| text.push_str(fragment));
    }
    let tail = decoder.finish();
    parser.push(&tail, |fragment| text.push_str(fragment));
    let report = parser.finish(|fragment| text.push_str(fragment));
    (text, report)
}

#[test]
fn two_chunk_stream_yields_hello() -> AppResult<()> {
    let first = "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"Hel\"}}\n";
    let second = "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"lo\"}}\ndata: [DONE]\n";
    let (text, report) = collect_text(&[first.as_bytes(), second.as_bytes()]);
    if text != "Hello" {
        return Err(AppError::validation(format!("Unexpected text: {}", text)));
    }
    if report.discarded_bytes != 0 {
        return Err(AppError::validation("Expected nothing discarded"));
    }
    Ok(())
}

#[test]
fn done_frame_never_emits() -> AppResult<()> {
    let mut fragments = Vec::new();
    let remainder = consume("data: [DONE]\ndata:[DONE]\n", |fragment| {
        fragments.push(fragment.to_owned());
    });
    if !fragments.is_empty() {
        return Err(AppError::validation(format!(
            "Unexpected fragments: {:?}",
            fragments
        )));
    }
    if !remainder.is_empty() {
        return Err(AppError::validation(format!(
            "Unexpected remainder: {}",
            remainder
        )));
    }
    Ok(())
}

#[test]
fn incomplete_trailing_frame_is_retried() -> AppResult<()> {
    let whole = delta("split");
    let (head, tail) = whole.split_at(30);

    let mut fragments = Vec::new();
    let remainder = consume(head, |fragment| fragments.push(fragment.to_owned()));
    if !fragments.is_empty() {
        return Err(AppError::validation("Partial frame must not emit"));
    }
    if remainder != head {
        return Err(AppError::validation(format!(
            "Expected partial frame as remainder, got: {}",
            remainder
        )));
    }

    let mut replay = remainder;
    replay.push_str(tail);
    let next = consume(&replay, |fragment| fragments.push(fragment.to_owned()));
    if fragments != ["split"] {
        return Err(AppError::validation(format!(
            "Unexpected fragments: {:?}",
            fragments
        )));
    }
    if !next.is_empty() {
        return Err(AppError::validation("Expected empty remainder"));
    }
    Ok(())
}

#[test]
fn trailing_line_without_marker_is_carried() -> AppResult<()> {
    let remainder = consume("event: ping\nda", |_fragment| {});
    if remainder != "da" {
        return Err(AppError::validation(format!(
            "Unexpected remainder: {}",
            remainder
        )));
    }

    let mut text = String::new();
    let resumed = format!(
        "{}ta: {{\"type\":\"content_block_delta\",\"delta\":{{\"text\":\"ok\"}}}}\n",
        remainder
    );
    let next = consume(&resumed, |fragment| text.push_str(fragment));
    if text != "ok" || !next.is_empty() {
        return Err(AppError::validation(format!(
            "Unexpected resume result: {} / {}",
            text, next
        )));
    }
    Ok(())
}

#[test]
fn every_chunk_split_yields_identical_text() -> AppResult<()> {
    let stream = sample_stream();
    let bytes = stream.as_bytes();
    let (expected, _) = collect_text(&[bytes]);
    if expected != "Hello, wörld ✓" {
        return Err(AppError::validation(format!(
            "Unexpected whole-stream text: {}",
            expected
        )));
    }

    for split in 0..=bytes.len() {
        let (left, right) = bytes.split_at(split);
        let (text, report) = collect_text(&[left, right]);
        if text != expected || report.discarded_bytes != 0 {
            return Err(AppError::validation(format!(
                "Split at {} produced '{}'",
                split, text
            )));
        }
    }

    let single_bytes: Vec<&[u8]> = bytes.chunks(1).collect();
    let (text, _) = collect_text(&single_bytes);
    if text != expected {
        return Err(AppError::validation(format!(
            "Byte-at-a-time produced '{}'",
            text
        )));
    }

    for size in [2usize, 3, 7, 16, 41] {
        let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
        let (chunked, _) = collect_text(&chunks);
        if chunked != expected {
            return Err(AppError::validation(format!(
                "Chunk size {} produced '{}'",
                size, chunked
            )));
        }
    }
    Ok(())
}

#[test]
fn crlf_frames_and_message_delta_text_are_parsed() -> AppResult<()> {
    let mut text = String::new();
    let input = "data: {\"type\":\"message_delta\",\"delta\":{\"text\":\"a\"}}\r\n\
data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"b\"}}\r\n";
    let remainder = consume(input, |fragment| text.push_str(fragment));
    if text != "ab" {
        return Err(AppError::validation(format!("Unexpected text: {}", text)));
    }
    if !remainder.is_empty() {
        return Err(AppError::validation("Expected empty remainder"));
    }
    Ok(())
}

#[test]
fn frames_without_text_are_ignored() -> AppResult<()> {
    let mut fragments = Vec::new();
    let input = "data: {\"type\":\"content_block_start\",\"delta\":{\"text\":\"no\"}}\n\
data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"\"}}\n\
data: {\"type\":\"content_block_delta\",\"delta\":{\"partial_json\":\"{}\"}}\n\
data: 42\n\
data: null\n";
    let remainder = consume(input, |fragment| fragments.push(fragment.to_owned()));
    if !fragments.is_empty() {
        return Err(AppError::validation(format!(
            "Unexpected fragments: {:?}",
            fragments
        )));
    }
    if !remainder.is_empty() {
        return Err(AppError::validation("Expected empty remainder"));
    }
    Ok(())
}

#[test]
fn malformed_frame_holds_back_the_rest_until_flush() -> AppResult<()> {
    let mut parser = StreamFrameParser::new();
    let mut text = String::new();
    let input = format!("{}data: {{not json}}\n{}", delta("a"), delta("b"));
    parser.push(&input, |fragment| text.push_str(fragment));
    if text != "a" {
        return Err(AppError::validation(format!("Unexpected text: {}", text)));
    }
    if !parser.remainder().starts_with("data: {not json}") {
        return Err(AppError::validation(format!(
            "Unexpected remainder: {}",
            parser.remainder()
        )));
    }

    let report = parser.finish(|fragment| text.push_str(fragment));
    if text != "a" {
        return Err(AppError::validation(format!(
            "Flush must not skip past a malformed frame: {}",
            text
        )));
    }
    if report.discarded_bytes == 0 {
        return Err(AppError::validation("Expected discarded bytes"));
    }
    Ok(())
}

#[test]
fn finish_on_blank_remainder_is_a_no_op() -> AppResult<()> {
    let mut parser = StreamFrameParser::new();
    parser.push("data: [DONE]\n  ", |_fragment| {});
    let report = parser.finish(|_fragment| {});
    if report != FlushReport::default() {
        return Err(AppError::validation("Expected empty flush report"));
    }
    Ok(())
}

#[test]
fn decoder_holds_split_multibyte_characters() -> AppResult<()> {
    let bytes = "é✓".as_bytes();
    let mut decoder = Utf8ChunkDecoder::new();
    let first = decoder.decode(bytes.get(..1).unwrap_or_default());
    let second = decoder.decode(bytes.get(1..3).unwrap_or_default());
    let third = decoder.decode(bytes.get(3..).unwrap_or_default());
    if !first.is_empty() || second != "é" || third != "✓" {
        return Err(AppError::validation(format!(
            "Unexpected decode: '{}' '{}' '{}'",
            first, second, third
        )));
    }
    if !decoder.finish().is_empty() {
        return Err(AppError::validation("Expected nothing pending"));
    }
    Ok(())
}

#[test]
fn decoder_replaces_invalid_bytes() -> AppResult<()> {
    let mut decoder = Utf8ChunkDecoder::new();
    let text = decoder.decode(&[b'a', 0xFF, b'b']);
    if text != "a\u{FFFD}b" {
        return Err(AppError::validation(format!("Unexpected decode: {}", text)));
    }
    let pending = decoder.decode(&[0xE2, 0x9C]);
    let tail = decoder.finish();
    if !pending.is_empty() || tail != "\u{FFFD}" {
        return Err(AppError::validation(format!(
            "Unexpected tail: '{}' '{}'",
            pending, tail
        )));
    }
    Ok(())
}
