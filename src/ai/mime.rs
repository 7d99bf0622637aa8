use base64::Engine as _;

/// Sniff an image format from its magic bytes.
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// Media type for an inline payload. Trusts an `image/*` declaration,
/// otherwise sniffs the decoded bytes so untyped images aren't dropped.
pub fn resolve_media_type(declared: &str, payload_b64: &str) -> String {
    if declared.starts_with("image/") {
        return declared.to_string();
    }

    let sniffed = base64::engine::general_purpose::STANDARD
        .decode(payload_b64)
        .ok()
        .and_then(|bytes| detect_image_mime(&bytes));

    match sniffed {
        Some(mime) => {
            tracing::debug!(
                "Inline data declared as '{}' sniffed as {}",
                declared,
                mime
            );
            mime.to_string()
        }
        None => declared.to_string(),
    }
}
