//! Encode/split/wrap and the inverse, unwrap/merge/decode.

use {
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// One bounded-length text unit of an encoded payload.
///
/// Frames are self-describing (they carry their own `index`/`total`), so
/// reassembly does not depend on arrival order. Indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub index: u32,
    pub total: u32,
    pub payload: String,
}

/// Base64-encode `bytes` and split the encoded text into frames of at most
/// `max_payload_len` characters (the last chunk may be shorter).
///
/// Empty input yields no frames. `max_payload_len` must be positive; zero is
/// treated as 1.
pub fn encode(bytes: &[u8], max_payload_len: usize) -> Vec<Frame> {
    let max_payload_len = max_payload_len.max(1);
    let encoded = BASE64.encode(bytes);

    let chunks: Vec<&str> = encoded
        .as_bytes()
        .chunks(max_payload_len)
        // Base64 output is pure ASCII, so byte chunks are valid UTF-8.
        .map(|c| std::str::from_utf8(c).unwrap_or_default())
        .collect();

    let total = chunks.len() as u32;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, payload)| Frame {
            index: i as u32 + 1,
            total,
            payload: payload.to_string(),
        })
        .collect()
}

/// Render a frame into the wire format understood by the device:
///
/// ```text
/// msg {index}/{total}:
/// {payload}
/// end
/// ```
#[must_use]
pub fn wrap(frame: &Frame) -> String {
    format!("msg {}/{}:\n{}\nend", frame.index, frame.total, frame.payload)
}

/// Parse concatenated wrapped blocks back into frames.
///
/// Blank lines between blocks are tolerated; anything else that does not
/// match the three-line header/payload/footer grammar is a format error.
pub fn unwrap(text: &str) -> Result<Vec<Frame>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() % 3 != 0 {
        return Err(Error::format(format!(
            "expected blocks of 3 lines, got {} lines",
            lines.len()
        )));
    }

    let mut frames = Vec::with_capacity(lines.len() / 3);
    for block in lines.chunks(3) {
        let (index, total) = parse_header(block[0])?;
        if block[2] != "end" {
            return Err(Error::format(format!(
                "expected 'end' footer, got '{}'",
                block[2]
            )));
        }
        frames.push(Frame {
            index,
            total,
            payload: block[1].to_string(),
        });
    }
    Ok(frames)
}

/// Reassemble the original bytes from a (possibly out-of-order) frame set.
///
/// Verifies that the set covers exactly indices `1..=total` with a single
/// consistent `total`, concatenates payloads in index order, and
/// base64-decodes the result.
pub fn decode(frames: &[Frame]) -> Result<Vec<u8>> {
    if frames.is_empty() {
        return Ok(Vec::new());
    }

    let total = frames[0].total;
    if frames.iter().any(|f| f.total != total) {
        return Err(Error::incomplete("frames disagree on total count"));
    }
    if frames.len() != total as usize {
        return Err(Error::incomplete(format!(
            "have {} frames, expected {total}",
            frames.len()
        )));
    }

    let mut ordered = frames.to_vec();
    ordered.sort_by_key(|f| f.index);

    for (i, frame) in ordered.iter().enumerate() {
        let expected = i as u32 + 1;
        if frame.index != expected {
            return Err(Error::incomplete(format!(
                "missing or duplicated index {expected}"
            )));
        }
    }

    let merged: String = ordered.iter().map(|f| f.payload.as_str()).collect();
    Ok(BASE64.decode(merged)?)
}

fn parse_header(line: &str) -> Result<(u32, u32)> {
    let rest = line
        .strip_prefix("msg ")
        .ok_or_else(|| Error::format(format!("expected 'msg i/t:' header, got '{line}'")))?;
    let rest = rest
        .strip_suffix(':')
        .ok_or_else(|| Error::format(format!("header missing trailing ':': '{line}'")))?;
    let (index, total) = rest
        .split_once('/')
        .ok_or_else(|| Error::format(format!("header missing '/': '{line}'")))?;

    let index: u32 = index
        .parse()
        .map_err(|_| Error::format(format!("bad frame index in '{line}'")))?;
    let total: u32 = total
        .parse()
        .map_err(|_| Error::format(format!("bad frame total in '{line}'")))?;
    Ok((index, total))
}
