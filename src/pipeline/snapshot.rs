use image::{ExtendedColorType, ImageEncoder, codecs::jpeg::JpegEncoder};
use rayon::prelude::*;

use super::compositor::Canvas;
use crate::error::SnapshotError;

pub const SNAPSHOT_QUALITY: u8 = 95;
pub const SNAPSHOT_CONTENT_TYPE: &str = "image/jpeg";

/// Encode the canvas as a JPEG, dropping the (always opaque) alpha channel.
pub fn encode_snapshot(canvas: &Canvas) -> Result<Vec<u8>, SnapshotError> {
    if canvas.is_empty() {
        return Err(SnapshotError::EmptyCanvas);
    }
    let expected = canvas.width as usize * canvas.height as usize * 4;
    if canvas.rgba.len() != expected {
        return Err(SnapshotError::BufferMismatch {
            expected,
            actual: canvas.rgba.len(),
        });
    }

    let rgb: Vec<u8> = canvas
        .rgba
        .par_chunks_exact(4)
        .flat_map_iter(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, SNAPSHOT_QUALITY).write_image(
        &rgb,
        canvas.width,
        canvas.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Encode and hand the bytes to `sink`; used by the "Save Look" action.
pub fn export_snapshot<F>(canvas: &Canvas, sink: F) -> Result<(), SnapshotError>
where
    F: FnOnce(Vec<u8>),
{
    let bytes = encode_snapshot(canvas)?;
    log::info!(
        "exported {}x{} snapshot ({} bytes)",
        canvas.width,
        canvas.height,
        bytes.len()
    );
    sink(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_canvas_is_refused() {
        let err = encode_snapshot(&Canvas::new()).unwrap_err();
        assert!(matches!(err, SnapshotError::EmptyCanvas));

        let mut called = false;
        assert!(export_snapshot(&Canvas::new(), |_| called = true).is_err());
        assert!(!called);
    }

    #[test]
    fn encodes_a_decodable_jpeg() {
        let canvas = Canvas {
            rgba: [200u8, 30, 60, 255].repeat(16 * 12),
            width: 16,
            height: 12,
        };
        let mut exported = None;
        export_snapshot(&canvas, |bytes| exported = Some(bytes)).unwrap();
        let bytes = exported.unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }

    #[test]
    fn mismatched_buffer_is_reported() {
        let canvas = Canvas {
            rgba: vec![0; 10],
            width: 4,
            height: 4,
        };
        assert!(matches!(
            encode_snapshot(&canvas),
            Err(SnapshotError::BufferMismatch { expected: 64, actual: 10 })
        ));
    }
}
