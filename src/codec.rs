use crate::error::CodecError;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use std::io::Read;

/// Content-type substrings and the extension they map to. First match wins.
const EXTENSIONS: &[(&str, &str)] = &[
    ("text/html", "html"),
    ("application/xhtml+xml", "html"),
    ("application/json", "json"),
    ("text/plain", "txt"),
    ("text/xml", "xml"),
    ("application/xml", "xml"),
    ("text/css", "css"),
    ("application/javascript", "js"),
    ("text/javascript", "js"),
];

/// Maps a `Content-Type` header value to the extension the body is saved under.
///
/// Unknown or empty types fall back to `txt`.
pub fn extension_for(content_type: &str) -> &'static str {
    let content_type = content_type.to_ascii_lowercase();

    EXTENSIONS
        .iter()
        .find(|(pattern, _)| content_type.contains(pattern))
        .map(|(_, extension)| *extension)
        .unwrap_or("txt")
}

/// Undoes every encoding listed in a `Content-Encoding` header.
///
/// Tokens are unwrapped starting from the last one listed. An empty header
/// returns the body unchanged.
pub fn decompress(body: &[u8], content_encoding: &str) -> Result<Vec<u8>, CodecError> {
    let mut data = body.to_vec();

    for token in content_encoding.split(',').map(str::trim).rev() {
        data = match token.to_ascii_lowercase().as_str() {
            "" => data,
            "gzip" => read_all(GzDecoder::new(data.as_slice()), "gzip")?,
            "deflate" => inflate(&data)?,
            "br" => brotli_decompress(&data)?,
            _ => return Err(CodecError::UnsupportedEncoding(token.to_string())),
        };
    }

    Ok(data)
}

/// Raw deflate, or zlib-wrapped deflate when the stream carries a zlib header.
fn inflate(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if has_zlib_header(data) {
        read_all(ZlibDecoder::new(data), "deflate")
    } else {
        read_all(DeflateDecoder::new(data), "deflate")
    }
}

fn has_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => cmf & 0x0f == 8 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

#[cfg(feature = "brotli")]
fn brotli_decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    read_all(brotli::Decompressor::new(data, 4096), "br")
}

#[cfg(not(feature = "brotli"))]
fn brotli_decompress(_data: &[u8]) -> Result<Vec<u8>, CodecError> {
    Err(CodecError::UnavailableCodec("br".to_string()))
}

fn read_all(mut reader: impl Read, encoding: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|source| CodecError::Decompress {
            encoding: encoding.to_string(),
            source,
        })?;
    Ok(out)
}
