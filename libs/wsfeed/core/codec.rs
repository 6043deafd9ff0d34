//! Frame decoding
//!
//! Exchanges mix plain text JSON frames with GZIP-compressed binary frames
//! (including a compressed literal pong). Everything is turned into a UTF-8
//! payload here, before the handler sees it.

use crate::traits::{FeedError, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tokio_tungstenite::tungstenite::Message;

/// GZIP member header magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound for a decompressed frame
const MAX_DECOMPRESSED_SIZE: u64 = 16 * 1024 * 1024;

/// Decode one WebSocket frame into a text payload
///
/// Returns `Ok(None)` for control frames (ping/pong/close), which carry no
/// application payload.
pub fn decode_frame(msg: Message) -> Result<Option<String>> {
    match msg {
        Message::Text(text) => Ok(Some(text)),
        Message::Binary(data) => decode_binary(&data).map(Some),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => Ok(None),
    }
}

/// Decode a binary frame: GZIP when the magic header is present, raw UTF-8 otherwise
pub fn decode_binary(data: &[u8]) -> Result<String> {
    if data.starts_with(&GZIP_MAGIC) {
        gunzip(data)
    } else {
        String::from_utf8(data.to_vec())
            .map_err(|e| FeedError::Decode(format!("binary frame is not UTF-8: {}", e)))
    }
}

fn gunzip(data: &[u8]) -> Result<String> {
    let mut out = String::new();
    GzDecoder::new(data)
        .take(MAX_DECOMPRESSED_SIZE)
        .read_to_string(&mut out)
        .map_err(|e| FeedError::Decode(format!("gzip decompression failed: {}", e)))?;
    Ok(out)
}
