//! Framing shared by every schema version: `base64(gzip(json))`.

use std::io::{self, Read, Write};

use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};

use crate::codec::Malformed;

/// Upper bound on the decompressed size of a payload. Real profiles are a few kilobytes.
const MAX_PAYLOAD_LEN: u64 = 16 * 1024 * 1024;

pub(crate) fn pack(json: &[u8]) -> io::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json)?;

    Ok(STANDARD.encode(encoder.finish()?))
}

pub(crate) fn unpack(payload: &str) -> Result<Vec<u8>, Malformed> {
    unpack_limited(payload, MAX_PAYLOAD_LEN)
}

fn unpack_limited(payload: &str, limit: u64) -> Result<Vec<u8>, Malformed> {
    let compressed = STANDARD.decode(payload)?;

    let mut json = Vec::new();
    let read = GzDecoder::new(compressed.as_slice())
        .take(limit.saturating_add(1))
        .read_to_end(&mut json)
        .map_err(Malformed::Compression)?;

    if !u64::try_from(read).is_ok_and(|read| read <= limit) {
        return Err(Malformed::Compression(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed payload exceeds {limit} bytes"),
        )));
    }

    Ok(json)
}
