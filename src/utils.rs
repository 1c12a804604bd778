use percent_encoding::percent_decode_str;

/// Decodes a form-style encoded string: `+` becomes a space, `%XX` escapes are
/// decoded, and invalid UTF-8 is replaced rather than rejected.
pub fn url_decode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Returns true when the bytes start with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1F && bytes[1] == 0x8B
}
