/// A story opening that streams plain text, pauses for an image, and carries a
/// multi-byte character on each side of the marker.
pub fn interrupted_story_fixture() -> &'static str {
    return r#"Once upon a time, a café owner named Zoë opened her shutters. __interrupt__:{"tool_name":"generate_image","args":{"prompt":"a café at dawn ☕"},"message":"Generate this image?"}"#;
}

/// A story opening that never pauses.
pub fn plain_story_fixture() -> &'static str {
    return "The lighthouse keeper counted ships until the fog rolled in. Then she counted gulls.";
}

/// Splits `text` into byte chunks at the given offsets. Offsets are allowed to
/// land inside a multi-byte character.
pub fn split_bytes(text: &str, offsets: &[usize]) -> Vec<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut chunks = vec![];
    let mut start = 0;
    for offset in offsets {
        chunks.push(bytes[start..*offset].to_vec());
        start = *offset;
    }
    chunks.push(bytes[start..].to_vec());

    return chunks;
}
