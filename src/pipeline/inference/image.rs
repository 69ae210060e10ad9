use base64::Engine as _;

/// Maximum raw image size accepted for inline submission (20 MB).
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// An image ready for inline submission: MIME type plus base64 data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: &'static str,
    pub base64_data: String,
}

impl ImagePayload {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            mime_type: sniff_mime_type(bytes),
            base64_data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// `data:` URL form used by chat-completions image parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}

/// Detect the image MIME type from magic bytes. Unknown formats are sent as
/// JPEG, the most common scan format.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
