use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::domain::{ReferenceImage, ReferenceImageError};

/// Upper bound for a single inline reference payload.
pub const MAX_REFERENCE_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

pub fn reference_mime_type(path: impl AsRef<Path>) -> Option<&'static str> {
    let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

pub fn load_reference_image(path: impl AsRef<Path>) -> Result<ReferenceImage, ReferenceImageError> {
    let path = path.as_ref();
    let mime_type =
        reference_mime_type(path).ok_or_else(|| ReferenceImageError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;

    let io_error = |error: std::io::Error| ReferenceImageError::Io {
        path: path.to_path_buf(),
        message: error.to_string(),
    };
    let size = fs::metadata(path).map_err(io_error)?.len();
    if size > MAX_REFERENCE_IMAGE_BYTES {
        return Err(ReferenceImageError::TooLarge {
            path: path.to_path_buf(),
            bytes: size,
            limit: MAX_REFERENCE_IMAGE_BYTES,
        });
    }

    let bytes = fs::read(path).map_err(io_error)?;
    encode_reference_image(path, &bytes, mime_type)
}

pub fn encode_reference_image(
    path: &Path,
    bytes: &[u8],
    mime_type: &str,
) -> Result<ReferenceImage, ReferenceImageError> {
    if bytes.is_empty() {
        return Err(ReferenceImageError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(ReferenceImage::new(STANDARD.encode(bytes), mime_type))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{encode_reference_image, load_reference_image, reference_mime_type};
    use crate::domain::ReferenceImageError;

    #[test]
    fn mime_type_is_inferred_case_insensitively() {
        assert_eq!(reference_mime_type("refs/face.PNG"), Some("image/png"));
        assert_eq!(reference_mime_type("refs/face.Jpeg"), Some("image/jpeg"));
        assert_eq!(reference_mime_type("refs/face.webp"), Some("image/webp"));
        assert_eq!(reference_mime_type("refs/face.bmp"), None);
        assert_eq!(reference_mime_type("refs/face"), None);
    }

    #[test]
    fn encode_produces_base64_payload() {
        let image = encode_reference_image(Path::new("a.png"), b"hello", "image/png")
            .expect("non-empty payload should encode");

        assert_eq!(image.data, "aGVsbG8=");
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn load_rejects_unsupported_extension_before_reading() {
        let error = load_reference_image("/definitely/missing/file.txt")
            .expect_err("unsupported extension should fail");

        assert!(matches!(error, ReferenceImageError::UnsupportedFormat { .. }));
    }

    #[test]
    fn load_reports_missing_file_as_io_error() {
        let error = load_reference_image("/definitely/missing/file.png")
            .expect_err("missing file should fail");

        assert!(matches!(error, ReferenceImageError::Io { .. }));
    }
}
