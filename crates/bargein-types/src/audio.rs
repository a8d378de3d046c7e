use base64::Engine;

/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;

/// Encodes raw audio bytes for transport inside a JSON event.
pub fn encode(bytes: &[u8]) -> Base64EncodedAudioBytes {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decodes a base64 audio payload back into raw bytes.
pub fn decode(fragment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(fragment)
}
